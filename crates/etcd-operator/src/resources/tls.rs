use crate::crds::common::SecuritySpec;

/// Scheme served on the client listener and advertised to clients.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientScheme {
    Plaintext,
    Tls,
}

impl ClientScheme {
    pub fn as_str(self) -> &'static str {
        match self {
            ClientScheme::Plaintext => "http",
            ClientScheme::Tls => "https",
        }
    }
}

/// How peer traffic is secured.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PeerTls {
    /// Self-signed certificates generated by etcd, no mutual auth.
    Auto,
    /// Operator-mounted certificate plus trusted CA, mutual auth required.
    Explicit {
        ca_secret: Option<String>,
        cert_secret: String,
    },
}

/// TLS layout derived once from the security policy and threaded into every
/// builder that needs it, so volumes, mounts and flags cannot disagree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TlsPlan {
    pub peer: PeerTls,
    pub server_secret: Option<String>,
    pub client_ca_secret: Option<String>,
}

impl TlsPlan {
    pub fn from_security(security: Option<&SecuritySpec>) -> Self {
        let tls = security.map(|s| &s.tls);
        let peer = match tls.and_then(|t| non_empty(&t.peer_secret)) {
            Some(cert_secret) => PeerTls::Explicit {
                // A missing CA reference still yields a CA volume; the pod is
                // then rejected at admission rather than silently unauthenticated.
                ca_secret: tls.and_then(|t| non_empty(&t.peer_trusted_ca_secret)),
                cert_secret,
            },
            None => PeerTls::Auto,
        };

        Self {
            peer,
            server_secret: tls.and_then(|t| non_empty(&t.server_secret)),
            client_ca_secret: tls.and_then(|t| non_empty(&t.client_trusted_ca_secret)),
        }
    }

    pub fn client_scheme(&self) -> ClientScheme {
        if self.server_secret.is_some() {
            ClientScheme::Tls
        } else {
            ClientScheme::Plaintext
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crds::common::TlsSpec;

    fn security(peer: &str, server: &str, client: &str) -> SecuritySpec {
        SecuritySpec {
            tls: TlsSpec {
                peer_trusted_ca_secret: Some(format!("{peer}-ca")).filter(|_| !peer.is_empty()),
                peer_secret: Some(peer.into()),
                server_secret: Some(server.into()),
                client_trusted_ca_secret: Some(client.into()),
            },
        }
    }

    #[test]
    fn test_no_security_is_auto_peer_plaintext_client() {
        let plan = TlsPlan::from_security(None);
        assert_eq!(plan.peer, PeerTls::Auto);
        assert_eq!(plan.client_scheme(), ClientScheme::Plaintext);
        assert!(plan.client_ca_secret.is_none());
    }

    #[test]
    fn test_empty_strings_are_unset() {
        let plan = TlsPlan::from_security(Some(&security("", "", "")));
        assert_eq!(plan.peer, PeerTls::Auto);
        assert!(plan.server_secret.is_none());
        assert!(plan.client_ca_secret.is_none());
    }

    #[test]
    fn test_full_security() {
        let plan = TlsPlan::from_security(Some(&security("p", "s", "c")));
        assert_eq!(
            plan.peer,
            PeerTls::Explicit {
                ca_secret: Some("p-ca".into()),
                cert_secret: "p".into()
            }
        );
        assert_eq!(plan.client_scheme(), ClientScheme::Tls);
        assert_eq!(plan.client_scheme().as_str(), "https");
        assert_eq!(plan.client_ca_secret.as_deref(), Some("c"));
    }

    #[test]
    fn test_peer_ca_without_peer_secret_is_ignored() {
        let spec = SecuritySpec {
            tls: TlsSpec {
                peer_trusted_ca_secret: Some("orphan-ca".into()),
                ..Default::default()
            },
        };
        assert_eq!(TlsPlan::from_security(Some(&spec)).peer, PeerTls::Auto);
    }
}
