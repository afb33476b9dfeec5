use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::info;

/// Uppercase letters and digits with look-alikes (I, O, 0, 1) removed.
pub const CHALLENGE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const CHALLENGE_LENGTH: usize = 6;
pub const CODE_LENGTH: usize = 6;

/// Human-readable challenge the complainant must retype before a code is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge(String);

impl Challenge {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let value = (0..CHALLENGE_LENGTH)
            .map(|_| {
                let index = rng.gen_range(0..CHALLENGE_ALPHABET.len());
                CHALLENGE_ALPHABET[index] as char
            })
            .collect();
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, answer: &str) -> bool {
        answer.trim().to_ascii_uppercase() == self.0
    }
}

/// Six-digit numeric code, never starting with zero.
pub fn generate_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    rng.gen_range(100_000..=999_999u32).to_string()
}

/// Limits applied to issued codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationPolicy {
    pub code_ttl: Duration,
    pub max_code_attempts: u32,
}

impl Default for VerificationPolicy {
    fn default() -> Self {
        Self {
            code_ttl: Duration::from_secs(600),
            max_code_attempts: 5,
        }
    }
}

/// A code that has been delivered and is awaiting confirmation.
#[derive(Debug, Clone)]
pub(crate) struct IssuedCode {
    pub(crate) code: String,
    pub(crate) issued_at: DateTime<Utc>,
    pub(crate) failed_attempts: u32,
}

impl IssuedCode {
    pub(crate) fn new(code: String, issued_at: DateTime<Utc>) -> Self {
        Self {
            code,
            issued_at,
            failed_attempts: 0,
        }
    }

    pub(crate) fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => now.signed_duration_since(self.issued_at) > ttl,
            Err(_) => false,
        }
    }
}

/// Outbound delivery for one-time codes (e-mail, SMS, ...).
pub trait CodeSender: Send + Sync {
    fn send_code(&self, destination: &str, code: &str) -> Result<(), DeliveryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("code delivery transport unavailable: {0}")]
    Transport(String),
    #[error("destination '{destination}' refused the verification code")]
    Rejected { destination: String },
}

/// Development sender: writes the code to the log instead of delivering it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingCodeSender;

impl CodeSender for LoggingCodeSender {
    fn send_code(&self, destination: &str, code: &str) -> Result<(), DeliveryError> {
        info!(%destination, %code, "verification code issued (log delivery)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn challenges_use_unambiguous_alphabet() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let challenge = Challenge::generate(&mut rng);
            assert_eq!(challenge.as_str().len(), CHALLENGE_LENGTH);
            assert!(challenge
                .as_str()
                .bytes()
                .all(|b| CHALLENGE_ALPHABET.contains(&b)));
            assert!(!challenge.as_str().contains(&['I', 'O', '0', '1'][..]));
        }
    }

    #[test]
    fn challenge_matches_case_insensitively() {
        let challenge = Challenge("AB3XYZ".to_string());
        assert!(challenge.matches("ab3xyz"));
        assert!(challenge.matches(" AB3xyz "));
        assert!(!challenge.matches("AB3XY"));
    }

    #[test]
    fn codes_are_six_digits() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let code = generate_code(&mut rng);
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.bytes().all(|b| b.is_ascii_digit()));
            assert_ne!(code.as_bytes()[0], b'0');
        }
    }

    #[test]
    fn issued_codes_expire_after_ttl() {
        let issued_at = Utc::now();
        let code = IssuedCode::new("123456".to_string(), issued_at);
        let ttl = Duration::from_secs(60);
        assert!(!code.is_expired(issued_at + chrono::Duration::seconds(60), ttl));
        assert!(code.is_expired(issued_at + chrono::Duration::seconds(61), ttl));
    }
}
