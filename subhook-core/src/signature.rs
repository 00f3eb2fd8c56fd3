// File: subhook-core/src/signature.rs
//
// HMAC-SHA256 authentication of inbound webhook deliveries. Nothing the
// endpoint does after this check may trust an unverified request.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::Error;

type HmacSha256 = Hmac<Sha256>;

/// Prefix the remote service puts in front of the hex digest.
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Lowercase hex HMAC-SHA256 of `message` under `secret`.
pub fn hmac_hex(secret: &[u8], message: &[u8]) -> String {
    // HMAC accepts keys of any length, so this never fails.
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret)
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any size"));
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

/// Computes the header value the remote service would send for this delivery:
/// `"sha256=" + hex(HMAC(secret, message_id ‖ timestamp ‖ body))`.
pub fn sign(secret: &str, message_id: &str, timestamp: &str, body: &[u8]) -> String {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any size"));
    mac.update(message_id.as_bytes());
    mac.update(timestamp.as_bytes());
    mac.update(body);
    format!("{SIGNATURE_PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
}

/// Returns true iff `provided` is byte-equal to the expected signature.
///
/// Missing headers should be passed as empty strings; they simply fail to match.
pub fn verify(
    secret: &str,
    message_id: &str,
    timestamp: &str,
    body: &[u8],
    provided: &str,
) -> bool {
    let expected = sign(secret, message_id, timestamp, body);
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

/// [`verify`] as a `Result`, for callers that propagate with `?`.
pub fn authenticate(
    secret: &str,
    message_id: &str,
    timestamp: &str,
    body: &[u8],
    provided: &str,
) -> Result<(), Error> {
    if verify(secret, message_id, timestamp, body, provided) {
        Ok(())
    } else {
        Err(Error::SignatureRejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "supersecretstring";

    #[test]
    fn hmac_matches_known_vector() {
        let expected = "72f7e4e306649a53f01d7353b36e9b50d49871d2d33d4588bb068356e25c6f5d";
        assert_eq!(hmac_hex(SECRET.as_bytes(), b"hello world"), expected);

        // id ‖ timestamp ‖ body concatenates to the same message.
        assert_eq!(sign(SECRET, "hello", " ", b"world"), format!("sha256={expected}"));
    }

    #[test]
    fn sign_then_verify_accepts() {
        let body = br#"{"subscription":{"id":"sub-1"}}"#;
        let sig = sign(SECRET, "msg-1", "2024-01-01T00:00:00Z", body);
        assert!(verify(SECRET, "msg-1", "2024-01-01T00:00:00Z", body, &sig));
    }

    #[test]
    fn any_single_byte_flip_rejects() {
        let id = "msg-1";
        let ts = "2024-01-01T00:00:00Z";
        let body = b"{\"event\":{}}".to_vec();
        let sig = sign(SECRET, id, ts, &body);

        for i in 0..body.len() {
            let mut tampered = body.clone();
            tampered[i] ^= 0x01;
            assert!(!verify(SECRET, id, ts, &tampered, &sig), "body byte {i}");
        }

        let flip = |s: &str, i: usize| -> String {
            let mut bytes = s.as_bytes().to_vec();
            bytes[i] ^= 0x01;
            String::from_utf8(bytes).unwrap()
        };
        for i in 0..id.len() {
            assert!(!verify(SECRET, &flip(id, i), ts, &body, &sig), "id byte {i}");
        }
        for i in 0..ts.len() {
            assert!(!verify(SECRET, id, &flip(ts, i), &body, &sig), "ts byte {i}");
        }
        for i in 0..SECRET.len() {
            assert!(!verify(&flip(SECRET, i), id, ts, &body, &sig), "secret byte {i}");
        }
    }

    #[test]
    fn missing_or_malformed_header_rejects() {
        let body = b"{}";
        assert!(!verify(SECRET, "", "", body, ""));
        assert!(!verify(SECRET, "id", "ts", body, "sha256="));
        assert!(!verify(SECRET, "id", "ts", body, "not-a-signature"));

        let sig = sign(SECRET, "id", "ts", body);
        assert!(!verify(SECRET, "id", "ts", body, &sig.to_uppercase()));
        assert!(!verify(SECRET, "id", "ts", body, &sig[SIGNATURE_PREFIX.len()..]));

        let err = authenticate(SECRET, "id", "ts", body, "sha256=00").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::SignatureRejected);
        assert!(authenticate(SECRET, "id", "ts", body, &sig).is_ok());
    }
}
