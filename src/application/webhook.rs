//! Webhook signature verification (`X-Hub-Signature: sha1=<hex>`).

use std::fmt;

use hmac::{Hmac, Mac};
use sha1::Sha1;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha1 = Hmac<Sha1>;

/// Header carrying the request signature.
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature";

const SIGNATURE_ALGORITHM: &str = "sha1";

/// Shared secret used to sign webhook deliveries.
#[derive(Clone)]
pub struct WebhookSecret(String);

impl WebhookSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WebhookSecret(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("signature header is missing")]
    MissingHeader,
    #[error("signature header is malformed")]
    Malformed,
    #[error("signature algorithm `{0}` is not supported")]
    UnsupportedAlgorithm(String),
    #[error("signature does not match the request body")]
    Mismatch,
}

impl SignatureError {
    /// Short, stable label for logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingHeader => "missing_header",
            Self::Malformed => "malformed",
            Self::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            Self::Mismatch => "mismatch",
        }
    }
}

/// Check `header` against the HMAC-SHA1 of `body` keyed by `secret`.
pub fn check_signature(
    secret: &WebhookSecret,
    body: &[u8],
    header: Option<&str>,
) -> Result<(), SignatureError> {
    let header = header.ok_or(SignatureError::MissingHeader)?;
    let (algorithm, digest) = header.split_once('=').ok_or(SignatureError::Malformed)?;

    if algorithm != SIGNATURE_ALGORITHM {
        return Err(SignatureError::UnsupportedAlgorithm(algorithm.to_string()));
    }

    let expected = hex::encode(digest_of(secret, body));
    if expected.as_bytes().ct_eq(digest.as_bytes()).into() {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

pub fn verify(secret: &WebhookSecret, body: &[u8], header: Option<&str>) -> bool {
    check_signature(secret, body, header).is_ok()
}

/// Header value a sender would attach to `body`.
pub fn sign(secret: &WebhookSecret, body: &[u8]) -> String {
    format!("{SIGNATURE_ALGORITHM}={}", hex::encode(digest_of(secret, body)))
}

fn digest_of(secret: &WebhookSecret, body: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha1::new_from_slice(secret.expose())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(body);
    mac.finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPECTED: &str = "sha1=001d36761d49b3373ebc74b207bf164d54156428";

    fn secret() -> WebhookSecret {
        WebhookSecret::new("s3cr3t")
    }

    #[test]
    fn sign_matches_known_vector() {
        assert_eq!(sign(&secret(), b"payload"), EXPECTED);
    }

    #[test]
    fn accepts_valid_signature() {
        assert!(verify(&secret(), b"payload", Some(EXPECTED)));
    }

    #[test]
    fn rejects_flipped_digest() {
        let flipped = EXPECTED.replace("001d", "101d");
        assert_eq!(
            check_signature(&secret(), b"payload", Some(&flipped)),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn rejects_other_algorithms() {
        let header = EXPECTED.replacen("sha1", "sha256", 1);
        assert_eq!(
            check_signature(&secret(), b"payload", Some(&header)),
            Err(SignatureError::UnsupportedAlgorithm("sha256".to_string()))
        );
    }

    #[test]
    fn rejects_missing_or_malformed_header() {
        assert_eq!(
            check_signature(&secret(), b"payload", None),
            Err(SignatureError::MissingHeader)
        );
        assert_eq!(
            check_signature(&secret(), b"payload", Some("001d36761d49b3373ebc74b207bf164d54156428")),
            Err(SignatureError::Malformed)
        );
        assert!(!verify(&secret(), b"payload", Some("sha1=")));
    }

    #[test]
    fn rejects_tampered_body() {
        assert!(!verify(&secret(), b"payload!", Some(EXPECTED)));
    }

    #[test]
    fn uppercase_hex_is_rejected() {
        assert!(!verify(&secret(), b"payload", Some(&EXPECTED.to_uppercase())));
    }

    #[test]
    fn debug_output_redacts_secret() {
        assert!(!format!("{:?}", secret()).contains("s3cr3t"));
    }
}
