use std::sync::LazyLock;

use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, TextEncoder};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

// --- Global metrics registered with the default prometheus registry ---

static RECONCILIATIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "etcd_operator_reconciliations_total",
            "Total number of EtcdCluster reconciliations by outcome",
        ),
        &["outcome"],
    )
    .expect("metric can be created");
    prometheus::register(Box::new(counter.clone())).expect("metric can be registered");
    counter
});

static RECONCILE_ERRORS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "etcd_operator_reconcile_errors_total",
            "Failed reconciliations by error kind",
        ),
        &["kind"],
    )
    .expect("metric can be created");
    prometheus::register(Box::new(counter.clone())).expect("metric can be registered");
    counter
});

static RECONCILE_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    let hist = HistogramVec::new(
        HistogramOpts::new(
            "etcd_operator_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        ),
        &["outcome"],
    )
    .expect("metric can be created");
    prometheus::register(Box::new(hist.clone())).expect("metric can be registered");
    hist
});

/// Record a finished reconciliation and how long it took.
pub fn record_reconciliation(outcome: &str, duration_secs: f64) {
    RECONCILIATIONS.with_label_values(&[outcome]).inc();
    RECONCILE_DURATION
        .with_label_values(&[outcome])
        .observe(duration_secs);
}

/// Count a failed reconciliation by `OperatorError::kind`.
pub fn record_error(kind: &str) {
    RECONCILE_ERRORS.with_label_values(&[kind]).inc();
}

/// Encode all registered metrics as Prometheus text format.
fn encode_metrics() -> Result<Vec<u8>, String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| format!("Failed to encode metrics: {e}"))?;
    Ok(buffer)
}

fn respond(path: &str) -> (&'static str, &'static str, Vec<u8>) {
    match path {
        "/metrics" => match encode_metrics() {
            Ok(data) => ("200 OK", "text/plain; version=0.0.4; charset=utf-8", data),
            Err(e) => ("500 Internal Server Error", "text/plain", e.into_bytes()),
        },
        "/healthz" | "/readyz" => ("200 OK", "text/plain", b"ok".to_vec()),
        _ => ("404 Not Found", "text/plain", b"not found".to_vec()),
    }
}

/// Serve `/metrics`, `/healthz` and `/readyz` until `shutdown` fires.
pub async fn serve(addr: String, shutdown: CancellationToken) -> std::io::Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    info!("Metrics server listening on {addr}");

    loop {
        let accepted = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => accepted,
        };
        match accepted {
            Ok((mut stream, _)) => {
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 4096];
                    let n = match stream.read(&mut buf).await {
                        Ok(n) => n,
                        Err(_) => return,
                    };
                    let request = String::from_utf8_lossy(&buf[..n]);

                    let path = request
                        .lines()
                        .next()
                        .and_then(|line| line.split_whitespace().nth(1))
                        .unwrap_or("/");

                    let (status, content_type, body) = respond(path);
                    let header = format!(
                        "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        body.len()
                    );

                    let _ = stream.write_all(header.as_bytes()).await;
                    let _ = stream.write_all(&body).await;
                });
            }
            Err(e) => {
                error!("Failed to accept metrics connection: {e}");
            }
        }
    }

    info!("Metrics server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_reconciliation() {
        record_reconciliation("created", 0.2);
        record_reconciliation("updated", 0.5);

        assert!(RECONCILIATIONS.with_label_values(&["created"]).get() >= 1);
        assert!(
            RECONCILE_DURATION
                .with_label_values(&["updated"])
                .get_sample_count()
                >= 1
        );
    }

    #[test]
    fn test_record_error() {
        record_error("object_conflict");
        assert!(RECONCILE_ERRORS.with_label_values(&["object_conflict"]).get() >= 1);
    }

    #[test]
    fn test_routes() {
        record_reconciliation("created", 0.1);
        let (status, _, body) = respond("/metrics");
        assert_eq!(status, "200 OK");
        assert!(String::from_utf8(body)
            .unwrap()
            .contains("etcd_operator_reconciliations_total"));
        assert_eq!(respond("/healthz").0, "200 OK");
        assert_eq!(respond("/readyz").0, "200 OK");
        assert_eq!(respond("/nope").0, "404 Not Found");
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(serve("127.0.0.1:0".into(), shutdown.clone()));
        shutdown.cancel();
        handle.await.unwrap().unwrap();
    }
}
