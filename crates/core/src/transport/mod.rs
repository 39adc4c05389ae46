//! TLS setup for the control channel
//!
//! Samsung TVs serve the control endpoint with a self-signed certificate
//! that no CA chain will ever validate, so the client accepts any server
//! certificate. Trust trade-off: the channel is
//! encrypted but the TV is not authenticated, and anyone able to spoof the
//! TV's address on the LAN can receive the pairing token and the key
//! presses. The pairing token itself is what authorizes this controller
//! to the TV.

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::ring::default_provider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};
use std::sync::Arc;
use tokio_tungstenite::Connector;

use crate::Result;

/// Certificate verifier that accepts every server certificate
///
/// Only used for the TV control channel, see the module docs.
#[derive(Debug)]
pub struct AcceptAnyCert;

impl ServerCertVerifier for AcceptAnyCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        // Older Tizen firmware still signs with SHA-1
        vec![
            SignatureScheme::RSA_PKCS1_SHA1,
            SignatureScheme::ECDSA_SHA1_Legacy,
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::ECDSA_NISTP521_SHA512,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
            SignatureScheme::ED25519,
            SignatureScheme::ED448,
        ]
    }
}

/// Rustls client config for the TV: ring provider, no certificate checks
///
/// Uses an explicit provider so it works whether or not a process-wide
/// default has been installed.
pub fn insecure_client_config() -> Result<ClientConfig> {
    let config = ClientConfig::builder_with_provider(Arc::new(default_provider()))
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyCert))
        .with_no_client_auth();
    Ok(config)
}

/// WebSocket connector for the control channel
///
/// `None` for plain `ws://`, which tokio-tungstenite handles on its own.
pub fn connector(secure: bool) -> Result<Option<Connector>> {
    if !secure {
        return Ok(None);
    }
    Ok(Some(Connector::Rustls(Arc::new(insecure_client_config()?))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insecure_client_config_builds() {
        let config = insecure_client_config().unwrap();
        assert!(config.alpn_protocols.is_empty());
    }

    #[test]
    fn test_plain_connector_is_none() {
        assert!(connector(false).unwrap().is_none());
    }

    #[test]
    fn test_secure_connector_is_rustls() {
        assert!(matches!(connector(true).unwrap(), Some(Connector::Rustls(_))));
    }

    #[test]
    fn test_verifier_accepts_arbitrary_cert() {
        let cert = CertificateDer::from(vec![0u8; 16]);
        let name = ServerName::try_from("192.168.1.20").unwrap();
        let result = AcceptAnyCert.verify_server_cert(&cert, &[], &name, &[], UnixTime::now());
        assert!(result.is_ok());
    }
}
