use std::collections::BTreeMap;

use crate::constants::{env, paths, ports};
use crate::resources::tls::{PeerTls, TlsPlan};

/// etcd command line.
pub fn build_command() -> Vec<String> {
    vec!["etcd".into()]
}

/// etcd arguments in fixed precedence: user options, endpoint flags, peer
/// TLS, server TLS, client CA. Options arrive sorted by flag name.
pub fn build_args(
    cluster_name: &str,
    options: &BTreeMap<String, String>,
    tls: &TlsPlan,
) -> Vec<String> {
    let mut args: Vec<String> = options
        .iter()
        .map(|(name, value)| {
            if value.is_empty() {
                format!("--{name}")
            } else {
                format!("--{name}={value}")
            }
        })
        .collect();

    args.extend(endpoint_flags(cluster_name, tls));
    args.extend(peer_tls_flags(&tls.peer));

    if tls.server_secret.is_some() {
        args.push(format!("--cert-file={}/{}", paths::SERVER_CERT_DIR, paths::CERT_FILE));
        args.push(format!("--key-file={}/{}", paths::SERVER_CERT_DIR, paths::KEY_FILE));
    }

    if tls.client_ca_secret.is_some() {
        args.push(format!("--trusted-ca-file={}/{}", paths::CLIENT_CA_DIR, paths::CA_FILE));
        args.push("--client-cert-auth".into());
    }

    args
}

fn endpoint_flags(cluster_name: &str, tls: &TlsPlan) -> Vec<String> {
    let scheme = tls.client_scheme().as_str();
    let pod = format!("$({})", env::POD_NAME);
    let host = format!("{pod}.{cluster_name}.$({}).svc", env::POD_NAMESPACE);

    vec![
        format!("--name={pod}"),
        format!("--listen-metrics-urls=http://0.0.0.0:{}", ports::METRICS),
        format!("--listen-peer-urls=https://0.0.0.0:{}", ports::PEER),
        format!("--listen-client-urls={scheme}://0.0.0.0:{}", ports::CLIENT),
        format!("--initial-advertise-peer-urls=https://{host}:{}", ports::PEER),
        format!("--data-dir={}/default.etcd", paths::DATA_DIR),
        format!("--advertise-client-urls={scheme}://{host}:{}", ports::CLIENT),
    ]
}

fn peer_tls_flags(peer: &PeerTls) -> Vec<String> {
    match peer {
        PeerTls::Auto => vec!["--peer-auto-tls".into()],
        PeerTls::Explicit { .. } => vec![
            format!("--peer-trusted-ca-file={}/{}", paths::PEER_CA_DIR, paths::CA_FILE),
            format!("--peer-cert-file={}/{}", paths::PEER_CERT_DIR, paths::CERT_FILE),
            format!("--peer-key-file={}/{}", paths::PEER_CERT_DIR, paths::KEY_FILE),
            "--peer-client-cert-auth".into(),
        ],
    }
}
