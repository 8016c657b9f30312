//! Resolved transport configuration.
//!
//! Credential discovery (kubeconfig parsing, exec plugins, in-cluster
//! service accounts) happens outside this crate; whatever resolver is in
//! front hands us the finished coordinates below.
use std::time::Duration;

use secrecy::SecretString;

/// Everything the default client stack needs to reach one apiserver.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Base url of the apiserver (`scheme://host:port`, path prefix allowed)
    pub cluster_url: http::Uri,

    /// Namespace used by handles constructed without an explicit one
    pub default_namespace: String,

    /// PEM bundle of trust anchors for the apiserver certificate
    ///
    /// When empty, the system's native roots are used.
    pub root_cert_pem: Option<Vec<u8>>,

    /// PEM bundle holding a client certificate chain and its private key
    pub identity_pem: Option<Vec<u8>>,

    /// Bearer token attached to every request
    pub bearer_token: Option<SecretString>,

    /// Value of the `User-Agent` header
    pub user_agent: String,

    /// Bound on establishing a connection
    pub connect_timeout: Option<Duration>,

    /// Bound on awaiting response data
    ///
    /// Must comfortably exceed the watch timeout or long watches get cut
    /// mid-stream by our own client.
    pub read_timeout: Option<Duration>,

    /// Accept any server certificate; testing escape hatch only
    pub accept_invalid_certs: bool,
}

impl TransportConfig {
    /// A config for the given url with library defaults
    pub fn new(cluster_url: http::Uri) -> Self {
        TransportConfig {
            cluster_url,
            default_namespace: "default".to_string(),
            root_cert_pem: None,
            identity_pem: None,
            bearer_token: None,
            user_agent: format!("kubic/{}", env!("CARGO_PKG_VERSION")),
            connect_timeout: Some(Duration::from_secs(30)),
            read_timeout: Some(Duration::from_secs(295)),
            accept_invalid_certs: false,
        }
    }

    /// Set the default namespace
    #[must_use]
    pub fn default_namespace(mut self, ns: &str) -> Self {
        self.default_namespace = ns.to_string();
        self
    }

    /// Trust the apiserver certificate against this PEM bundle
    #[must_use]
    pub fn root_cert(mut self, pem: Vec<u8>) -> Self {
        self.root_cert_pem = Some(pem);
        self
    }

    /// Present a client certificate from this PEM bundle
    #[must_use]
    pub fn identity(mut self, pem: Vec<u8>) -> Self {
        self.identity_pem = Some(pem);
        self
    }

    /// Attach a bearer token to every request
    #[must_use]
    pub fn bearer_token(mut self, token: SecretString) -> Self {
        self.bearer_token = Some(token);
        self
    }

    /// Override the user agent
    #[must_use]
    pub fn user_agent(mut self, ua: &str) -> Self {
        self.user_agent = ua.to_string();
        self
    }
}
