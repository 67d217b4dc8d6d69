use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Header carrying the callback signature.
pub const SIGNATURE_HEADER: &str = "relay-signature";

/// Signing key pair for callback verification.
///
/// The hosted service rotates keys by signing with `current` and publishing
/// the upcoming key as `next`; both must be accepted during rotation.
#[derive(Debug, Clone)]
pub struct SigningKeys {
    /// Active signing key.
    pub current: String,
    /// Upcoming signing key, if a rotation is in progress.
    pub next: Option<String>,
}

impl SigningKeys {
    /// Create a key pair with only a current key.
    pub fn new(current: impl Into<String>) -> Self {
        Self {
            current: current.into(),
            next: None,
        }
    }

    /// Add the upcoming rotation key.
    pub fn with_next(mut self, next: impl Into<String>) -> Self {
        self.next = Some(next.into());
        self
    }
}

/// Claims of a callback signature token.
#[derive(Debug, Serialize, Deserialize)]
struct CallbackClaims {
    /// Expiry, seconds since epoch.
    exp: i64,
    /// base64url-encoded SHA-256 digest of the delivered body.
    body: String,
}

/// Verifies that a webhook callback originated from the hosted service.
///
/// The signature is an HS256 JWT over an expiry and a digest of the delivered
/// body. Verification decodes with the current key, falls back to the next
/// key on a signature mismatch only, then compares the body digest.
#[derive(Clone)]
pub struct SignatureVerifier {
    current: DecodingKey,
    next: Option<DecodingKey>,
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("next", &self.next.is_some())
            .finish()
    }
}

impl SignatureVerifier {
    /// Create a verifier from a signing key pair.
    pub fn new(keys: SigningKeys) -> Self {
        Self {
            current: DecodingKey::from_secret(keys.current.as_bytes()),
            next: keys
                .next
                .as_deref()
                .map(|k| DecodingKey::from_secret(k.as_bytes())),
        }
    }

    /// Check a raw signature against the delivered body.
    pub fn verify(&self, signature: &str, body: &str) -> bool {
        let claims = match decode_claims(signature, &self.current) {
            Ok(claims) => claims,
            Err(e) if signature_mismatch(&e) => {
                let Some(next) = &self.next else {
                    tracing::debug!(error = %e, "signature does not match current key");
                    return false;
                };
                match decode_claims(signature, next) {
                    Ok(claims) => claims,
                    Err(e) => {
                        tracing::debug!(error = %e, "signature matches neither signing key");
                        return false;
                    }
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "callback signature rejected");
                return false;
            }
        };

        claims.body == body_digest(body)
    }
}

fn decode_claims(
    token: &str,
    key: &DecodingKey,
) -> std::result::Result<CallbackClaims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);

    validation.validate_exp = true;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.leeway = 60; // 60 seconds clock skew tolerance

    validation.set_required_spec_claims(&["exp"]);

    decode::<CallbackClaims>(token, key, &validation).map(|data| data.claims)
}

fn signature_mismatch(e: &jsonwebtoken::errors::Error) -> bool {
    matches!(
        e.kind(),
        jsonwebtoken::errors::ErrorKind::InvalidSignature
    )
}

fn body_digest(body: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(body.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64
    }

    fn sign(body: &str, key: &str, exp: i64) -> String {
        let claims = CallbackClaims {
            exp,
            body: body_digest(body),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(key.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_valid_signature_with_current_key() {
        let verifier = SignatureVerifier::new(SigningKeys::new("current-key"));
        let body = r#"{"payload":{"to":"a@b.com"}}"#;
        let signature = sign(body, "current-key", now() + 300);

        assert!(verifier.verify(&signature, body));
    }

    #[test]
    fn test_valid_signature_with_next_key() {
        let verifier =
            SignatureVerifier::new(SigningKeys::new("current-key").with_next("next-key"));
        let body = r#"{"payload":1}"#;
        let signature = sign(body, "next-key", now() + 300);

        assert!(verifier.verify(&signature, body));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let verifier =
            SignatureVerifier::new(SigningKeys::new("current-key").with_next("next-key"));
        let body = r#"{"payload":1}"#;
        let signature = sign(body, "some-other-key", now() + 300);

        assert!(!verifier.verify(&signature, body));
    }

    #[test]
    fn test_body_mismatch_rejected() {
        let verifier = SignatureVerifier::new(SigningKeys::new("current-key"));
        let signature = sign(r#"{"payload":1}"#, "current-key", now() + 300);

        assert!(!verifier.verify(&signature, r#"{"payload":2}"#));
    }

    #[test]
    fn test_expired_signature_rejected() {
        let verifier = SignatureVerifier::new(SigningKeys::new("current-key"));
        let body = r#"{"payload":1}"#;
        let signature = sign(body, "current-key", now() - 3600);

        assert!(!verifier.verify(&signature, body));
    }

    #[test]
    fn test_garbage_signature_rejected() {
        let verifier = SignatureVerifier::new(SigningKeys::new("current-key"));
        assert!(!verifier.verify("not-a-token", "{}"));
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let verifier = SignatureVerifier::new(SigningKeys::new("current-key"));
        let body = r#"{"payload":1}"#;
        let mut signature = sign(body, "current-key", now() + 300);

        if let Some(last_char) = signature.pop() {
            let replacement = if last_char == 'a' { 'b' } else { 'a' };
            signature.push(replacement);
        }

        assert!(!verifier.verify(&signature, body));
    }
}
