// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payment webhook signature verification.
//!
//! The payment provider signs the raw request body with HMAC-SHA256 using the
//! shared secret and sends the base64 digest in `X-Content-HMAC`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the body signature.
pub const SIGNATURE_HEADER: &str = "x-content-hmac";

/// Computes the base64 signature of `body`.
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(body);
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Verifies `header` against the body signature in constant time.
pub fn verify(secret: &str, body: &[u8], header: Option<&str>) -> bool {
    let Some(header) = header else {
        return false;
    };
    let Ok(expected) = STANDARD.decode(header.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_body_verifies() {
        let body = br#"{"InvoiceId":"7","Amount":100,"Status":"Completed"}"#;
        let signature = sign("s3cret", body);
        assert!(verify("s3cret", body, Some(&signature)));
    }

    #[test]
    fn wrong_secret_or_tampered_body_fails() {
        let body = b"payload";
        let signature = sign("s3cret", body);
        assert!(!verify("other", body, Some(&signature)));
        assert!(!verify("s3cret", b"payload!", Some(&signature)));
    }

    #[test]
    fn missing_or_garbled_header_fails() {
        assert!(!verify("s3cret", b"payload", None));
        assert!(!verify("s3cret", b"payload", Some("not base64 !!")));
    }
}
