//! Time-based one-time passwords (RFC 6238) for the admin login second step.
//!
//! Codes are 6 digits over 30-second steps, HMAC-SHA256. Verification accepts
//! one step of clock skew in either direction. Secrets are stored and shown
//! base32-encoded (RFC 4648, no padding), the format authenticator apps expect.

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use url::Url;

use crate::errors::Error;

const STEP_SECONDS: u64 = 30;
const DIGITS: u32 = 6;
const SECRET_BYTES: usize = 20;

const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Encode bytes as RFC 4648 base32 without padding.
pub fn base32_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(5) * 8);
    for chunk in data.chunks(5) {
        let mut buf = [0u8; 5];
        buf[..chunk.len()].copy_from_slice(chunk);
        let bits = u64::from(buf[0]) << 32
            | u64::from(buf[1]) << 24
            | u64::from(buf[2]) << 16
            | u64::from(buf[3]) << 8
            | u64::from(buf[4]);
        let out_chars = match chunk.len() {
            1 => 2,
            2 => 4,
            3 => 5,
            4 => 7,
            _ => 8,
        };
        for i in 0..out_chars {
            let index = ((bits >> (35 - i * 5)) & 0x1f) as usize;
            out.push(BASE32_ALPHABET[index] as char);
        }
    }
    out
}

/// Decode RFC 4648 base32, case-insensitive, ignoring padding.
pub fn base32_decode(input: &str) -> Result<Vec<u8>, Error> {
    let mut bits: u64 = 0;
    let mut bit_count = 0;
    let mut out = Vec::with_capacity(input.len() * 5 / 8);

    for c in input.chars().filter(|c| *c != '=') {
        let value = match c.to_ascii_uppercase() {
            c @ 'A'..='Z' => c as u64 - 'A' as u64,
            c @ '2'..='7' => c as u64 - '2' as u64 + 26,
            _ => {
                return Err(Error::BadRequest {
                    message: "Invalid base32 secret".to_string(),
                });
            }
        };
        bits = (bits << 5) | value;
        bit_count += 5;
        if bit_count >= 8 {
            bit_count -= 8;
            out.push((bits >> bit_count) as u8);
        }
    }
    Ok(out)
}

/// Generate a fresh random secret, base32-encoded.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    base32_encode(&bytes)
}

/// HOTP value for one counter (RFC 4226 dynamic truncation).
fn hotp(key: &[u8], counter: u64) -> Result<u32, Error> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).map_err(|e| Error::Internal {
        operation: format!("initialize TOTP HMAC: {e}"),
    })?;
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let code = u32::from(digest[offset] & 0x7f) << 24
        | u32::from(digest[offset + 1]) << 16
        | u32::from(digest[offset + 2]) << 8
        | u32::from(digest[offset + 3]);
    Ok(code % 10u32.pow(DIGITS))
}

/// The code for a secret at a given unix timestamp, zero-padded to 6 digits.
pub fn code_at(secret_b32: &str, unix_time: u64) -> Result<String, Error> {
    let key = base32_decode(secret_b32)?;
    let code = hotp(&key, unix_time / STEP_SECONDS)?;
    Ok(format!("{code:06}"))
}

/// Verify a submitted code against the secret, allowing one step of skew.
pub fn verify_code(secret_b32: &str, code: &str, unix_time: u64) -> Result<bool, Error> {
    if code.len() != DIGITS as usize || !code.chars().all(|c| c.is_ascii_digit()) {
        return Ok(false);
    }
    let counter = unix_time / STEP_SECONDS;
    for candidate in [counter.saturating_sub(1), counter, counter + 1] {
        let key = base32_decode(secret_b32)?;
        let expected = format!("{:06}", hotp(&key, candidate)?);
        if expected == code {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Verify a code against the current wall clock.
pub fn verify_code_now(secret_b32: &str, code: &str) -> Result<bool, Error> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| Error::Internal {
            operation: format!("read system clock: {e}"),
        })?
        .as_secs();
    verify_code(secret_b32, code, now)
}

/// Provisioning URI for authenticator apps.
pub fn otpauth_url(issuer: &str, account: &str, secret_b32: &str) -> Result<String, Error> {
    let mut url = Url::parse("otpauth://totp").map_err(|e| Error::Internal {
        operation: format!("build otpauth url: {e}"),
    })?;
    url.set_path(&format!("{issuer}:{account}"));
    url.query_pairs_mut()
        .append_pair("secret", secret_b32)
        .append_pair("issuer", issuer)
        .append_pair("algorithm", "SHA256")
        .append_pair("digits", &DIGITS.to_string())
        .append_pair("period", &STEP_SECONDS.to_string());
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base32_round_trip() {
        let data = b"Hello, world! 1234";
        let encoded = base32_encode(data);
        assert!(encoded.chars().all(|c| BASE32_ALPHABET.contains(&(c as u8))));
        assert_eq!(base32_decode(&encoded).unwrap(), data);
    }

    #[test]
    fn test_base32_known_vectors() {
        // RFC 4648 test vectors, padding stripped
        assert_eq!(base32_encode(b""), "");
        assert_eq!(base32_encode(b"f"), "MY");
        assert_eq!(base32_encode(b"fo"), "MZXQ");
        assert_eq!(base32_encode(b"foo"), "MZXW6");
        assert_eq!(base32_encode(b"foob"), "MZXW6YQ");
        assert_eq!(base32_encode(b"fooba"), "MZXW6YTB");
        assert_eq!(base32_encode(b"foobar"), "MZXW6YTBOI");
    }

    #[test]
    fn test_base32_decode_is_case_insensitive() {
        assert_eq!(base32_decode("mzxw6ytboi").unwrap(), b"foobar");
        assert_eq!(base32_decode("MZXW6YTBOI").unwrap(), b"foobar");
    }

    #[test]
    fn test_base32_decode_rejects_garbage() {
        assert!(base32_decode("not!base32").is_err());
        assert!(base32_decode("10").is_err()); // 0 and 1 are not in the alphabet
    }

    #[test]
    fn test_generated_secret_shape() {
        let secret = generate_secret();
        assert_eq!(secret.len(), 32); // 20 bytes -> 32 base32 chars
        assert_ne!(secret, generate_secret());
    }

    #[test]
    fn test_code_is_six_digits_and_stable_within_step() {
        let secret = generate_secret();
        let code = code_at(&secret, 1_700_000_000).unwrap();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));

        // Same 30s step, same code
        assert_eq!(code, code_at(&secret, 1_700_000_029 / 30 * 30).unwrap());
    }

    #[test]
    fn test_verify_accepts_adjacent_steps() {
        let secret = generate_secret();
        let now = 1_700_000_045;

        let current = code_at(&secret, now).unwrap();
        let previous = code_at(&secret, now - STEP_SECONDS).unwrap();
        let next = code_at(&secret, now + STEP_SECONDS).unwrap();

        assert!(verify_code(&secret, &current, now).unwrap());
        assert!(verify_code(&secret, &previous, now).unwrap());
        assert!(verify_code(&secret, &next, now).unwrap());

        // Two steps out is rejected
        let stale = code_at(&secret, now - 2 * STEP_SECONDS).unwrap();
        if stale != current && stale != previous && stale != next {
            assert!(!verify_code(&secret, &stale, now).unwrap());
        }
    }

    #[test]
    fn test_verify_rejects_malformed_codes() {
        let secret = generate_secret();
        assert!(!verify_code(&secret, "12345", 1_700_000_000).unwrap());
        assert!(!verify_code(&secret, "1234567", 1_700_000_000).unwrap());
        assert!(!verify_code(&secret, "abcdef", 1_700_000_000).unwrap());
    }

    #[test]
    fn test_otpauth_url_encodes_label() {
        let url = otpauth_url("CALI Sound", "admin@example.com", "MZXW6YTBOI").unwrap();
        assert!(url.starts_with("otpauth://totp/CALI%20Sound:admin@example.com?"));
        assert!(url.contains("secret=MZXW6YTBOI"));
        assert!(url.contains("issuer=CALI+Sound"));
        assert!(url.contains("algorithm=SHA256"));
        assert!(url.contains("digits=6"));
        assert!(url.contains("period=30"));
    }
}
