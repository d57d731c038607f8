use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

pub const SIGNATURE_HEADER: &str = "X-Slack-Signature";
pub const TIMESTAMP_HEADER: &str = "X-Slack-Request-Timestamp";
const SIGNATURE_VERSION: &str = "v0";
/// Requests signed longer ago than this are treated as replays.
pub const MAX_SIGNATURE_AGE_SECS: i64 = 5 * 60;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("The request timestamp is not a number: {0}")]
    InvalidTimestamp(String),
    #[error("The request timestamp is too far from the current time")]
    Expired,
    #[error("The signature is not in the expected format")]
    Malformed,
    #[error("The signature does not match the request")]
    Mismatch,
}

fn signing_mac(secret: &str, timestamp: &str, body: &[u8]) -> HmacSha256 {
    // HMAC accepts keys of any length
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => unreachable!("HMAC can take a key of any size"),
    };
    mac.update(SIGNATURE_VERSION.as_bytes());
    mac.update(b":");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    mac
}

/// The value Slack puts in the `X-Slack-Signature` header for this request: `v0=` followed by the hex HMAC-SHA256 of
/// `v0:<timestamp>:<body>`.
pub fn calculate_signature(secret: &str, timestamp: &str, body: &[u8]) -> String {
    let digest = signing_mac(secret, timestamp, body).finalize().into_bytes();
    format!("{SIGNATURE_VERSION}={}", to_hex(&digest))
}

/// Checks a Slack request signature. `now` is the current unix time in seconds.
pub fn verify_signature(
    secret: &str,
    timestamp: &str,
    signature: &str,
    body: &[u8],
    now: i64,
) -> Result<(), SignatureError> {
    let ts = timestamp.trim().parse::<i64>().map_err(|_| SignatureError::InvalidTimestamp(timestamp.to_string()))?;
    if (now - ts).abs() > MAX_SIGNATURE_AGE_SECS {
        return Err(SignatureError::Expired);
    }
    let hex = signature.strip_prefix("v0=").ok_or(SignatureError::Malformed)?;
    let expected = from_hex(hex).ok_or(SignatureError::Malformed)?;
    signing_mac(secret, timestamp, body).verify_slice(&expected).map_err(|_| SignatureError::Mismatch)
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn from_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len()).step_by(2).map(|i| s.get(i..i + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok())).collect()
}

/// Splits slash-command text the way a shell would, so that quoted names survive as one argument.
pub fn split_command_args(text: &str) -> Option<Vec<String>> {
    shlex::split(text)
}
