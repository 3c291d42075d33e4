use std::fmt;

use thiserror::Error;
use trust_dns_resolver::error::ResolveError;

use crate::context::ContextError;
use crate::smtp::SmtpStage;
use crate::syntax::SyntaxIssue;

/// Why a single stage of the verification pipeline failed.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("invalid email address: {}", join_issues(.issues))]
    InvalidEmail { issues: Vec<SyntaxIssue> },
    #[error("resolver initialization failed: {source}")]
    ResolverInit {
        #[source]
        source: std::io::Error,
    },
    #[error("NS lookup failed for {domain}: {source}")]
    NsLookup {
        domain: String,
        #[source]
        source: ResolveError,
    },
    #[error("no nameserver found for {domain}")]
    NoNameservers { domain: String },
    #[error("disposable email address")]
    DisposableEmail { domain: String },
    #[error("disposable domain list request failed: {source}")]
    ListFetch {
        #[source]
        source: reqwest::Error,
    },
    #[error("disposable domain list is not a JSON array of strings: {source}")]
    ListDecode {
        #[source]
        source: serde_json::Error,
    },
    #[error("MX lookup failed for {domain}: {source}")]
    MxLookup {
        domain: String,
        #[source]
        source: ResolveError,
    },
    #[error("mx record not found")]
    NoMxRecords { domain: String },
    #[error("connection to {host} failed: {source}")]
    Connect {
        host: String,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error during {stage}: {source}")]
    Io {
        stage: SmtpStage,
        #[source]
        source: std::io::Error,
    },
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("{stage} rejected by {host}: {code} {message}")]
    Rejected {
        host: String,
        stage: SmtpStage,
        code: u16,
        message: String,
    },
    #[error("failed to start verification worker: {source}")]
    Spawn {
        #[source]
        source: std::io::Error,
    },
    #[error("verification timed out")]
    Timeout,
    #[error("verification cancelled")]
    Cancelled,
}

impl VerifyError {
    pub(crate) fn invalid_email(issues: Vec<SyntaxIssue>) -> Self {
        Self::InvalidEmail { issues }
    }

    pub(crate) fn ns_lookup(domain: impl Into<String>, source: ResolveError) -> Self {
        Self::NsLookup {
            domain: domain.into(),
            source,
        }
    }

    pub(crate) fn mx_lookup(domain: impl Into<String>, source: ResolveError) -> Self {
        Self::MxLookup {
            domain: domain.into(),
            source,
        }
    }

    pub(crate) fn io(stage: SmtpStage, source: std::io::Error) -> Self {
        Self::Io { stage, source }
    }

    /// `true` for the two outcomes produced by an expired or cancelled [`Context`](crate::Context).
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout | Self::Cancelled)
    }
}

impl From<ContextError> for VerifyError {
    fn from(err: ContextError) -> Self {
        match err {
            ContextError::Cancelled => Self::Cancelled,
            ContextError::DeadlineExceeded => Self::Timeout,
        }
    }
}

fn join_issues(issues: &[SyntaxIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A failed verification, annotated with the address that was checked.
///
/// Displays as `email: kind`; [`source`](std::error::Error::source) skips the
/// kind, already part of the message, and goes straight to its cause.
#[derive(Debug)]
pub struct Error {
    email: String,
    kind: VerifyError,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.email, self.kind)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.kind)
    }
}

impl Error {
    pub(crate) fn new(email: impl Into<String>, kind: VerifyError) -> Self {
        Self {
            email: email.into(),
            kind,
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn kind(&self) -> &VerifyError {
        &self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_is_prefixed_with_address() {
        let err = Error::new(
            "user@example.com",
            VerifyError::NoMxRecords {
                domain: "example.com".into(),
            },
        );
        assert_eq!(err.to_string(), "user@example.com: mx record not found");
        assert_eq!(err.email(), "user@example.com");
    }

    #[test]
    fn chained_report_names_the_kind_once() {
        let err = Error::new(
            "user@example.com",
            VerifyError::NoMxRecords {
                domain: "example.com".into(),
            },
        );
        assert!(std::error::Error::source(&err).is_none());
        let report = format!("{:#}", anyhow::Error::from(err));
        assert_eq!(report, "user@example.com: mx record not found");

        let err = Error::new(
            "user@example.com",
            VerifyError::Connect {
                host: "mx.example.com".into(),
                source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
            },
        );
        let source = std::error::Error::source(&err).expect("io cause");
        assert_eq!(source.to_string(), "refused");
        let report = format!("{:#}", anyhow::Error::from(err));
        assert_eq!(report.matches("connection to mx.example.com failed").count(), 1);
    }

    #[test]
    fn invalid_email_lists_every_issue() {
        let err = VerifyError::invalid_email(vec![SyntaxIssue::MissingAt, SyntaxIssue::EmptyLocal]);
        let text = err.to_string();
        assert!(text.starts_with("invalid email address: "), "{text}");
        assert!(text.contains("; "), "{text}");
    }

    #[test]
    fn timeout_and_cancel_are_timeouts() {
        assert!(VerifyError::Timeout.is_timeout());
        assert!(VerifyError::Cancelled.is_timeout());
        assert!(
            !VerifyError::DisposableEmail {
                domain: "x.test".into()
            }
            .is_timeout()
        );
    }
}
