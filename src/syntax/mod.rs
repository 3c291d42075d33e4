//! Address grammar (stage 1).
//!
//! [`parse_address`] accepts the `dot-atom@domain` subset of RFC 5322 that
//! SMTP servers reliably understand: quoted local parts, comments, display
//! names and domain literals are all rejected.

mod domain;
mod local;

use thiserror::Error;

use crate::error::VerifyError;

/// RFC 5321 forward-path limit.
const MAX_ADDRESS_LEN: usize = 254;

/// A single grammar violation found in an address.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxIssue {
    #[error("address is empty")]
    Empty,
    #[error("total length {len} > 254")]
    TooLong { len: usize },
    #[error("missing '@'")]
    MissingAt,
    #[error("must contain exactly one '@' (found {count})")]
    MultipleAt { count: usize },
    #[error("'@' is the last character")]
    TrailingAt,
    #[error("local part is empty")]
    EmptyLocal,
    #[error("local part length {len} > 64")]
    LocalTooLong { len: usize },
    #[error("local part cannot start or end with '.', nor contain '..'")]
    LocalDots,
    #[error("local part contains forbidden character {0:?}")]
    LocalChar(char),
    #[error("domain is empty")]
    EmptyDomain,
    #[error("domain literals are not supported")]
    DomainLiteral,
    #[error("domain punycode conversion failed")]
    DomainIdna,
    #[error("domain must contain at least one dot")]
    DomainNoDot,
    #[error("empty domain label")]
    EmptyLabel,
    #[error("domain label '{label}' length {len} > 63")]
    LabelTooLong { label: String, len: usize },
    #[error("domain label '{label}' cannot start/end with '-'")]
    LabelHyphen { label: String },
    #[error("domain label '{label}' has invalid chars")]
    LabelChars { label: String },
}

/// An address that passed the grammar.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAddress {
    /// The trimmed address, used verbatim for `RCPT TO`.
    pub address: String,
    pub local: String,
    /// Everything after the last `@`, as written.
    pub domain: String,
    /// IDNA form of [`domain`](Self::domain), used for DNS queries.
    pub ascii_domain: String,
}

/// Parses `email` into local part and domain.
pub fn parse_address(email: &str) -> Result<ParsedAddress, VerifyError> {
    let input = email.trim();
    if input.is_empty() {
        return Err(VerifyError::invalid_email(vec![SyntaxIssue::Empty]));
    }

    let mut issues = Vec::new();
    if input.len() > MAX_ADDRESS_LEN {
        issues.push(SyntaxIssue::TooLong { len: input.len() });
    }

    let (local, domain) = match split_once_at(input) {
        Ok(parts) => parts,
        Err(issue) => {
            issues.push(issue);
            return Err(VerifyError::invalid_email(issues));
        }
    };

    local::check_local(local, &mut issues);
    let ascii_domain = domain::check_domain(domain, &mut issues);

    if !issues.is_empty() {
        return Err(VerifyError::invalid_email(issues));
    }

    // Re-derive the domain from the last '@' of the accepted text so that
    // nothing the grammar normalised can hide a malformed domain.
    let domain = match input.rfind('@') {
        Some(idx) if idx + 1 < input.len() => &input[idx + 1..],
        Some(_) => return Err(VerifyError::invalid_email(vec![SyntaxIssue::TrailingAt])),
        None => return Err(VerifyError::invalid_email(vec![SyntaxIssue::MissingAt])),
    };

    Ok(ParsedAddress {
        address: input.to_string(),
        local: local.to_string(),
        domain: domain.to_string(),
        ascii_domain: ascii_domain.unwrap_or_default(),
    })
}

fn split_once_at(input: &str) -> Result<(&str, &str), SyntaxIssue> {
    match input.matches('@').count() {
        0 => Err(SyntaxIssue::MissingAt),
        1 => match input.split_once('@') {
            Some((local, "")) if !local.is_empty() => Err(SyntaxIssue::TrailingAt),
            Some(parts) => Ok(parts),
            None => Err(SyntaxIssue::MissingAt),
        },
        count => Err(SyntaxIssue::MultipleAt { count }),
    }
}
