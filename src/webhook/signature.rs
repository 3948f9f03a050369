//! Webhook signature verification strategies
//!
//! Each provider signs deliveries differently; the scheme is fixed per
//! dispatcher at construction. All byte comparisons are constant-time, and
//! malformed signature material (bad hex, bad base64) verifies as false
//! rather than surfacing an error to the caller.

use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;
type HmacSha1 = Hmac<Sha1>;

/// Signing scheme used by a provider's webhook deliveries
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureScheme {
    /// Hex HMAC-SHA256 over the raw body; an optional `sha256=` prefix on
    /// the header value is stripped
    HmacSha256,

    /// Base64 HMAC-SHA1 over the body concatenated with an optional
    /// provider-specific string (e.g., the callback URL)
    HmacSha1Base64 {
        /// Extra bytes appended to the body before signing
        suffix: Option<String>,
    },

    /// Handshake scheme: the first delivery carries an `x-hook-secret`
    /// header to echo verbatim; later deliveries are verified as hex
    /// HMAC-SHA256 over the body
    HookSecret,

    /// Shared token compared constant-time against the header value
    VerificationToken,

    /// No signature; the provider relies on a challenge echo instead
    None,
}

impl SignatureScheme {
    /// Header carrying the signature for this scheme
    pub(crate) fn default_header(&self) -> &'static str {
        match self {
            SignatureScheme::HmacSha256 => "x-hub-signature-256",
            SignatureScheme::HmacSha1Base64 { .. } => "x-webhook-signature",
            SignatureScheme::HookSecret => "x-hook-signature",
            SignatureScheme::VerificationToken => "x-verification-token",
            SignatureScheme::None => "",
        }
    }
}

fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && bool::from(a.ct_eq(b))
}

fn hmac_sha256_digest(secret: &[u8], message: &[u8]) -> Option<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(message);
    Some(mac.finalize().into_bytes().to_vec())
}

/// Verify a signature against the raw request body
///
/// Never panics and never returns an error: any failure to decode or
/// compute verifies as `false`.
pub fn verify(scheme: &SignatureScheme, secret: &str, body: &[u8], signature: &str) -> bool {
    match scheme {
        SignatureScheme::HmacSha256 | SignatureScheme::HookSecret => {
            let hex_sig = signature.strip_prefix("sha256=").unwrap_or(signature);
            let provided = match hex::decode(hex_sig) {
                Ok(bytes) => bytes,
                Err(_) => return false,
            };
            match hmac_sha256_digest(secret.as_bytes(), body) {
                Some(expected) => ct_eq(&expected, &provided),
                None => false,
            }
        }
        SignatureScheme::HmacSha1Base64 { suffix } => {
            let mut mac = match HmacSha1::new_from_slice(secret.as_bytes()) {
                Ok(mac) => mac,
                Err(_) => return false,
            };
            mac.update(body);
            if let Some(suffix) = suffix {
                mac.update(suffix.as_bytes());
            }
            let expected = mac.finalize().into_bytes();
            let provided = match base64::engine::general_purpose::STANDARD.decode(signature) {
                Ok(bytes) => bytes,
                Err(_) => return false,
            };
            ct_eq(&expected, &provided)
        }
        SignatureScheme::VerificationToken => ct_eq(secret.as_bytes(), signature.as_bytes()),
        SignatureScheme::None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign_sha256_hex(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    fn sign_sha1_base64(secret: &str, body: &[u8], suffix: Option<&str>) -> String {
        let mut mac = HmacSha1::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        if let Some(suffix) = suffix {
            mac.update(suffix.as_bytes());
        }
        base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_hmac_sha256_valid() {
        let body = br#"{"event":"task.updated"}"#;
        let sig = sign_sha256_hex("s3cret", body);
        assert!(verify(&SignatureScheme::HmacSha256, "s3cret", body, &sig));
    }

    #[test]
    fn test_hmac_sha256_prefix_stripped() {
        let body = b"payload";
        let sig = format!("sha256={}", sign_sha256_hex("s3cret", body));
        assert!(verify(&SignatureScheme::HmacSha256, "s3cret", body, &sig));
    }

    #[test]
    fn test_tampered_body_fails_every_scheme() {
        let body = br#"{"amount":10}"#;
        let tampered = br#"{"amount":99}"#;

        let sig = sign_sha256_hex("k", body);
        assert!(!verify(&SignatureScheme::HmacSha256, "k", tampered, &sig));
        assert!(!verify(&SignatureScheme::HookSecret, "k", tampered, &sig));

        let sig = sign_sha1_base64("k", body, None);
        assert!(!verify(
            &SignatureScheme::HmacSha1Base64 { suffix: None },
            "k",
            tampered,
            &sig
        ));
    }

    #[test]
    fn test_wrong_secret_fails() {
        let body = b"payload";
        let sig = sign_sha256_hex("right", body);
        assert!(!verify(&SignatureScheme::HmacSha256, "wrong", body, &sig));
    }

    #[test]
    fn test_garbage_signatures_never_panic() {
        let body = b"payload";
        for garbage in ["", "zzzz", "not-hex!", "====", "sha256=xx-yy"] {
            assert!(!verify(&SignatureScheme::HmacSha256, "k", body, garbage));
            assert!(!verify(
                &SignatureScheme::HmacSha1Base64 { suffix: None },
                "k",
                body,
                garbage
            ));
        }
    }

    #[test]
    fn test_sha1_base64_with_callback_url_suffix() {
        let body = br#"{"action":{"type":"updateCard"}}"#;
        let url = "https://hooks.example.com/trello";
        let sig = sign_sha1_base64("k", body, Some(url));

        let scheme = SignatureScheme::HmacSha1Base64 {
            suffix: Some(url.to_string()),
        };
        assert!(verify(&scheme, "k", body, &sig));

        // Same body signed without the suffix does not verify
        let bare = sign_sha1_base64("k", body, None);
        assert!(!verify(&scheme, "k", body, &bare));
    }

    #[test]
    fn test_verification_token() {
        let scheme = SignatureScheme::VerificationToken;
        assert!(verify(&scheme, "tok-123", b"ignored", "tok-123"));
        assert!(!verify(&scheme, "tok-123", b"ignored", "tok-124"));
        assert!(!verify(&scheme, "tok-123", b"ignored", "tok-12"));
    }

    #[test]
    fn test_none_scheme_accepts_anything() {
        assert!(verify(&SignatureScheme::None, "", b"body", ""));
    }
}
