//! Time-based pairing code for the client-to-daemon `/pair` endpoint (spec
//! 3: "Time-based pairing token" — a 6-digit code derived deterministically
//! from `(api_key, current_30s_window)`, valid for the current window and
//! the previous one to absorb clock skew).

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Width of one pairing-code window (spec 3/8: "30s window ... tolerance
/// ... ≥ 30s, ≤ 60s" achieved by accepting the current and previous window).
pub const WINDOW_SECS: u64 = 30;

fn window_index(unix_secs: u64) -> u64 {
    unix_secs / WINDOW_SECS
}

/// Derives the 6-digit code for a given key and window index, formatted
/// `NNN-NNN` (spec 3: "human-friendly, 6 digits formatted NNN-NNN").
fn derive_code(api_key: &str, window: u64) -> String {
    let mut mac = HmacSha256::new_from_slice(api_key.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(&window.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    // Dynamic truncation in the style of RFC 4226 (HOTP): take a 4-byte
    // window from the digest at an offset derived from its last nibble,
    // mask off the sign bit, then reduce mod 10^6.
    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let truncated = u32::from_be_bytes([
        digest[offset] & 0x7f,
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ]);
    let code = truncated % 1_000_000;
    format!("{:03}-{:03}", code / 1000, code % 1000)
}

/// Normalizes user input that may or may not carry the canonical `NNN-NNN`
/// separator or spaces (spec 7: "inputs accepting spaces or no separator are
/// normalized before comparison").
fn normalize(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// `validate_code(api_key, code, now_unix_secs)`: true iff `code` matches the
/// derived code for the current window or the immediately preceding one
/// (spec 8: total tolerance in `[30s, 60s]`). Comparison is constant-time
/// over the normalized digit string to avoid leaking which window, if any,
/// matched.
pub fn validate_code(api_key: &str, code: &str, now_unix_secs: u64) -> bool {
    let normalized_input = normalize(code);
    if normalized_input.len() != 6 {
        return false;
    }

    let current = window_index(now_unix_secs);
    let windows = if current == 0 { vec![current] } else { vec![current, current - 1] };

    let mut any_match = false;
    for window in windows {
        let expected = normalize(&derive_code(api_key, window));
        let matches: bool = expected.as_bytes().ct_eq(normalized_input.as_bytes()).into();
        any_match |= matches;
    }
    any_match
}

/// The canonical `NNN-NNN` code for the current window, returned to a newly
/// enrolling client as a human-readable string (not itself used for
/// validation — callers re-derive and compare via [`validate_code`]).
pub fn current_code(api_key: &str, now_unix_secs: u64) -> String {
    derive_code(api_key, window_index(now_unix_secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "test-api-key-for-pairing-code-derivation";

    #[test]
    fn same_window_round_trips() {
        let code = current_code(KEY, 1_000_000);
        assert!(validate_code(KEY, &code, 1_000_000));
    }

    #[test]
    fn previous_window_still_validates_within_tolerance() {
        let t = 1_000_000u64;
        let code_at_t = current_code(KEY, t);
        let next_window_start = (window_index(t) + 1) * WINDOW_SECS;
        // 5s into the next window: total tolerance since code was minted is >= 30s.
        assert!(validate_code(KEY, &code_at_t, next_window_start + 5));
    }

    #[test]
    fn code_two_windows_old_is_rejected() {
        let t = 1_000_000u64;
        let code_at_t = current_code(KEY, t);
        let two_windows_later = t + 2 * WINDOW_SECS + 1;
        assert!(!validate_code(KEY, &code_at_t, two_windows_later));
    }

    #[test]
    fn codes_differ_across_windows() {
        let t = 1_000_000u64;
        let next_window_start = (window_index(t) + 1) * WINDOW_SECS;
        assert_ne!(current_code(KEY, t), current_code(KEY, next_window_start));
    }

    #[test]
    fn accepts_input_without_separator_or_with_spaces() {
        let code = current_code(KEY, 42);
        let digits_only = code.replace('-', "");
        let spaced = code.replace('-', " ");
        assert!(validate_code(KEY, &digits_only, 42));
        assert!(validate_code(KEY, &spaced, 42));
    }

    #[test]
    fn wrong_key_never_validates() {
        let code = current_code(KEY, 42);
        assert!(!validate_code("a-completely-different-key", &code, 42));
    }
}
