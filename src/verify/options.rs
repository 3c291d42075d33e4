use std::time::Duration;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

/// Public list of throwaway-mail domains, served as a JSON array of strings.
pub const DEFAULT_DISPOSABLE_LIST_URL: &str =
    "https://raw.githubusercontent.com/ivolo/disposable-email-domains/master/index.json";

/// Port used to reach mail exchangers.
pub const SMTP_PORT: u16 = 25;

/// Envelope sender presented in `MAIL FROM`.
pub const DEFAULT_MAIL_FROM: &str = "verify@example.com";

/// Name presented in `EHLO`/`HELO`.
pub const DEFAULT_HELO: &str = "localhost";

/// Configuration knobs for [`Verifier`](crate::Verifier).
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with-serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyOptions {
    pub disposable_list_url: String,
    pub smtp_port: u16,
    pub mail_from: String,
    pub helo_domain: String,
    /// Bounds the disposable-list request.
    pub http_timeout: Duration,
    pub connect_timeout: Duration,
    /// Per SMTP read/write.
    pub command_timeout: Duration,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            disposable_list_url: DEFAULT_DISPOSABLE_LIST_URL.to_string(),
            smtp_port: SMTP_PORT,
            mail_from: DEFAULT_MAIL_FROM.to_string(),
            helo_domain: DEFAULT_HELO.to_string(),
            http_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(5),
        }
    }
}

impl VerifyOptions {
    /// `EHLO` name, falling back to [`DEFAULT_HELO`] when left blank.
    pub fn helo_name(&self) -> &str {
        let trimmed = self.helo_domain.trim();
        if trimmed.is_empty() {
            DEFAULT_HELO
        } else {
            trimmed
        }
    }
}
