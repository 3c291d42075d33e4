#![forbid(unsafe_code)]
//! mailverify_lib : vérifie qu'une adresse e-mail est délivrable.
//!
//! Five checks run in order, each more expensive than the last, and the first
//! failure ends the call:
//!
//! 1. address syntax ([`parse_address`]);
//! 2. NS records for the domain;
//! 3. membership in a disposable-domain list fetched over HTTP;
//! 4. MX records, keeping the lowest preference;
//! 5. an SMTP `MAIL FROM` / `RCPT TO` exchange with that exchanger. No message
//!    is ever sent.
//!
//! ```no_run
//! use std::time::Duration;
//! use mailverify_lib::{Context, verify_with_context};
//!
//! let ctx = Context::with_timeout(Duration::from_secs(20));
//! match verify_with_context(&ctx, "someone@example.org") {
//!     Ok(report) => println!("deliverable via {}", report.mx.exchange),
//!     Err(err) => println!("not deliverable: {err}"),
//! }
//! ```

mod context;
mod disposable;
mod dns;
mod error;
mod smtp;
mod syntax;
mod verify;

pub use context::{CancelHandle, Context, ContextError};
pub use disposable::{DisposableDomains, HttpDisposableList, is_disposable};
pub use dns::{Lookup, MxRecord, build_resolver, preferred_exchange};
pub use error::{Error, VerifyError};
pub use smtp::{Envelope, ProbeTarget, ProbeTimeouts, SmtpEvent, SmtpReply, SmtpStage, probe};
pub use syntax::{ParsedAddress, SyntaxIssue, parse_address};
pub use verify::{
    DEFAULT_DISPOSABLE_LIST_URL, DEFAULT_HELO, DEFAULT_MAIL_FROM, SMTP_PORT, Verification,
    Verifier, VerifyOptions, verify, verify_with_context,
};
