//! Rustls client configuration from resolved transport settings.
use hyper_rustls::ConfigBuilderExt;
use rustls::{
    client::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier, ServerName},
    Certificate, ClientConfig, DigitallySignedStruct, PrivateKey,
};
use thiserror::Error;

use crate::config::TransportConfig;

/// Errors from tls setup.
#[derive(Debug, Error)]
pub enum Error {
    /// The trust anchor PEM bundle could not be read
    #[error("trust anchor PEM is invalid: {0}")]
    InvalidRootCertPem(#[source] std::io::Error),

    /// A trust anchor could not be added to the root store
    #[error("failed to add a root certificate: {0}")]
    AddRootCertificate(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The identity PEM bundle could not be read
    #[error("identity PEM is invalid: {0}")]
    InvalidIdentityPem(#[source] std::io::Error),

    /// The identity PEM is missing a private key
    #[error("identity PEM is missing a private key: the key must be PKCS8, RSA/PKCS1 or EC")]
    MissingPrivateKey,

    /// The identity PEM is missing a certificate
    #[error("identity PEM is missing a certificate")]
    MissingCertificate,

    /// The private key was rejected
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(#[source] rustls::Error),
}

/// Build a `rustls::ClientConfig` from the resolved transport settings.
pub(crate) fn rustls_client_config(config: &TransportConfig) -> Result<ClientConfig, Error> {
    let builder = ClientConfig::builder().with_safe_defaults();
    let builder = if let Some(pem) = &config.root_cert_pem {
        builder.with_root_certificates(root_store(pem)?)
    } else {
        builder.with_native_roots()
    };

    let mut client_config = if let Some(pem) = &config.identity_pem {
        let (chain, pkey) = client_auth(pem)?;
        builder
            .with_single_cert(chain, pkey)
            .map_err(Error::InvalidPrivateKey)?
    } else {
        builder.with_no_client_auth()
    };

    if config.accept_invalid_certs {
        client_config
            .dangerous()
            .set_certificate_verifier(std::sync::Arc::new(NoCertificateVerification {}));
    }
    Ok(client_config)
}

fn root_store(pem: &[u8]) -> Result<rustls::RootCertStore, Error> {
    let mut reader = std::io::Cursor::new(pem);
    let mut root_store = rustls::RootCertStore::empty();
    for der in rustls_pemfile::certs(&mut reader).map_err(Error::InvalidRootCertPem)? {
        root_store
            .add(&Certificate(der))
            .map_err(|e| Error::AddRootCertificate(Box::new(e)))?;
    }
    Ok(root_store)
}

fn client_auth(pem: &[u8]) -> Result<(Vec<Certificate>, PrivateKey), Error> {
    use rustls_pemfile::Item;

    let mut cert_chain = Vec::new();
    let mut pkcs8_key = None;
    let mut rsa_key = None;
    let mut ec_key = None;
    let mut reader = std::io::Cursor::new(pem);
    for item in rustls_pemfile::read_all(&mut reader).map_err(Error::InvalidIdentityPem)? {
        match item {
            Item::X509Certificate(cert) => cert_chain.push(Certificate(cert)),
            Item::PKCS8Key(key) => pkcs8_key = Some(PrivateKey(key)),
            Item::RSAKey(key) => rsa_key = Some(PrivateKey(key)),
            Item::ECKey(key) => ec_key = Some(PrivateKey(key)),
            _ => {}
        }
    }

    let private_key = pkcs8_key.or(rsa_key).or(ec_key).ok_or(Error::MissingPrivateKey)?;
    if cert_chain.is_empty() {
        return Err(Error::MissingCertificate);
    }
    Ok((cert_chain, private_key))
}

struct NoCertificateVerification {}

impl ServerCertVerifier for NoCertificateVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &Certificate,
        _intermediates: &[Certificate],
        _server_name: &ServerName,
        _scts: &mut dyn Iterator<Item = &[u8]>,
        _ocsp_response: &[u8],
        _now: std::time::SystemTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        tracing::warn!("server certificate verification bypassed");
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &Certificate,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &Certificate,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }
}
