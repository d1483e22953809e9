//! Expiry claim extraction from bearer tokens.
//!
//! Tokens are JWTs; only the `exp` claim of the payload segment is read.
//! Signatures are never verified here, the backend does that.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(default)]
    exp: Option<f64>,
}

fn expiry_claim(token: &str) -> Option<f64> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;
    claims.exp
}

/// Returns the expiry instant encoded in `token`, or `None` if the token is
/// malformed, carries no expiry or expires outside the representable range.
#[must_use]
pub fn expires_at(token: &str) -> Option<DateTime<Utc>> {
    let exp = expiry_claim(token).filter(|exp| exp.is_finite())?;
    #[allow(clippy::cast_possible_truncation)]
    let millis = (exp * 1000.0).floor() as i64;
    DateTime::from_timestamp_millis(millis)
}

/// Returns true if the token must be treated as absent at `now`.
///
/// The claim is compared as fractional seconds. Unparsable tokens count as
/// expired. A token whose expiry equals `now` is still valid.
#[must_use]
pub fn is_expired(token: &str, now: DateTime<Utc>) -> bool {
    #[allow(clippy::cast_precision_loss)]
    let now_secs = now.timestamp_millis() as f64 / 1000.0;
    expiry_claim(token).is_none_or(|exp| exp < now_secs)
}

#[cfg(test)]
pub(crate) fn make_token(exp: impl std::fmt::Display) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"1","exp":{exp}}}"#));
    format!("{header}.{payload}.signature")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_expires_at_reads_claim() {
        let token = make_token(1_700_000_000);
        assert_eq!(expires_at(&token).unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_future_token_is_valid() {
        let now = Utc::now();
        let token = make_token((now + Duration::hours(1)).timestamp());
        assert!(!is_expired(&token, now));
    }

    #[test]
    fn test_past_token_is_expired() {
        let now = Utc::now();
        let token = make_token((now - Duration::seconds(1)).timestamp());
        assert!(is_expired(&token, now));
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert!(!is_expired(&make_token(1_700_000_000), now));
    }

    #[test]
    fn test_fractional_expiry_is_not_rounded_down() {
        let now = DateTime::from_timestamp_millis(1_700_000_000_400).unwrap();
        assert!(!is_expired(&make_token("1700000000.5"), now));
        assert!(is_expired(&make_token("1700000000.3"), now));
        assert_eq!(
            expires_at(&make_token("1700000000.5")).unwrap().timestamp_millis(),
            1_700_000_000_500
        );
    }

    #[test]
    fn test_expiry_beyond_date_range_is_valid() {
        let token = make_token("1e300");
        assert!(expires_at(&token).is_none());
        assert!(!is_expired(&token, Utc::now()));
    }

    #[test]
    fn test_garbage_counts_as_expired() {
        let now = Utc::now();
        assert!(is_expired("not-a-token", now));
        assert!(is_expired("a.!!!.c", now));
        assert!(is_expired("", now));
    }

    #[test]
    fn test_missing_exp_counts_as_expired() {
        let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"1"}"#);
        assert!(is_expired(&format!("h.{payload}.s"), Utc::now()));
    }

    #[test]
    fn test_padded_payload_is_accepted() {
        let payload = format!("{}==", URL_SAFE_NO_PAD.encode(br#"{"exp":42}"#));
        assert_eq!(expires_at(&format!("h.{payload}.s")).unwrap().timestamp(), 42);
    }
}
