//! The verification pipeline.
//!
//! Stages run in a fixed order and the first failure ends the call:
//! syntax, nameservers, disposable list, MX selection, SMTP probe.

mod options;
mod types;

pub use options::{
    DEFAULT_DISPOSABLE_LIST_URL, DEFAULT_HELO, DEFAULT_MAIL_FROM, SMTP_PORT, VerifyOptions,
};
pub use types::Verification;

use std::sync::Arc;
use std::sync::mpsc::sync_channel;
use std::thread;

use tracing::{debug, info, warn};
use trust_dns_resolver::Resolver;

use crate::context::Context;
use crate::disposable::{self, DisposableDomains, HttpDisposableList};
use crate::dns::{self, Lookup, build_resolver};
use crate::error::{Error, VerifyError};
use crate::smtp::{self, Envelope, ProbeTarget, ProbeTimeouts};
use crate::syntax;

/// Verifies `email` with the system resolver and default options.
pub fn verify(email: &str) -> Result<Verification, Error> {
    verify_with_context(&Context::background(), email)
}

/// Like [`verify`], returning early once `ctx` is cancelled or past its deadline.
pub fn verify_with_context(ctx: &Context, email: &str) -> Result<Verification, Error> {
    if let Some(err) = ctx.err() {
        return Err(Error::new(email, err.into()));
    }
    let verifier = Verifier::from_system_conf(VerifyOptions::default())
        .map_err(|kind| Error::new(email, kind))?;
    verifier.verify_with_context(ctx, email)
}

/// Runs the pipeline against a DNS backend `L` and a disposable-list source `D`.
///
/// Cloning is cheap; clones share the backends.
pub struct Verifier<L = Resolver, D = HttpDisposableList> {
    lookup: Arc<L>,
    list: Arc<D>,
    options: Arc<VerifyOptions>,
}

impl<L, D> Clone for Verifier<L, D> {
    fn clone(&self) -> Self {
        Self {
            lookup: Arc::clone(&self.lookup),
            list: Arc::clone(&self.list),
            options: Arc::clone(&self.options),
        }
    }
}

impl Verifier {
    pub fn from_system_conf(options: VerifyOptions) -> Result<Self, VerifyError> {
        let resolver = build_resolver()?;
        let list = HttpDisposableList::new(options.disposable_list_url.clone())?;
        Ok(Self::with_parts(resolver, list, options))
    }
}

enum Signal {
    Done(Result<Verification, Error>),
    Cancelled,
}

impl<L, D> Verifier<L, D>
where
    L: Lookup + Send + Sync + 'static,
    D: DisposableDomains + Send + Sync + 'static,
{
    pub fn with_parts(lookup: L, list: D, options: VerifyOptions) -> Self {
        Self {
            lookup: Arc::new(lookup),
            list: Arc::new(list),
            options: Arc::new(options),
        }
    }

    /// Runs every stage on the calling thread.
    pub fn verify(&self, email: &str) -> Result<Verification, Error> {
        self.run(&Context::background(), email)
    }

    /// Runs the stages on a worker thread and waits for whichever comes first:
    /// the worker's outcome or the end of `ctx`. A worker that loses the race
    /// is left to finish and release its connections on its own.
    pub fn verify_with_context(&self, ctx: &Context, email: &str) -> Result<Verification, Error> {
        if let Some(err) = ctx.err() {
            warn!(email, %err, "context already done, verification skipped");
            return Err(Error::new(email, err.into()));
        }
        if ctx.is_background() {
            return self.run(ctx, email);
        }

        // room for the worker's outcome and a cancel wake-up, so neither blocks
        let (tx, rx) = sync_channel::<Signal>(2);
        let worker_tx = tx.clone();
        let worker = self.clone();
        let worker_ctx = ctx.clone();
        let worker_email = email.to_string();
        thread::Builder::new()
            .name("mailverify-pipeline".into())
            .spawn(move || {
                let outcome = worker.run(&worker_ctx, &worker_email);
                let _ = worker_tx.try_send(Signal::Done(outcome));
            })
            .map_err(|source| Error::new(email, VerifyError::Spawn { source }))?;

        match ctx.race(tx, &rx, Signal::Cancelled) {
            Ok(Signal::Done(outcome)) => outcome,
            Ok(Signal::Cancelled) => {
                warn!(email, "verification cancelled");
                Err(Error::new(email, VerifyError::Cancelled))
            }
            Err(err) => {
                warn!(email, %err, "verification abandoned");
                Err(Error::new(email, err.into()))
            }
        }
    }

    fn run(&self, ctx: &Context, email: &str) -> Result<Verification, Error> {
        match self.pipeline(ctx, email) {
            Ok(verification) => {
                info!(
                    email,
                    mx = %verification.mx.exchange,
                    "address accepted by mail exchanger"
                );
                Ok(verification)
            }
            Err(kind) => {
                debug!(email, error = %kind, "verification failed");
                Err(Error::new(email, kind))
            }
        }
    }

    fn pipeline(&self, ctx: &Context, email: &str) -> Result<Verification, VerifyError> {
        let address = syntax::parse_address(email)?;
        let domain = address.ascii_domain.as_str();

        checkpoint(ctx)?;
        debug!(email, domain, "checking nameservers");
        let nameservers = dns::check_nameservers(self.lookup.as_ref(), domain)?;

        checkpoint(ctx)?;
        debug!(email, domain, "checking disposable domain list");
        let http_timeout = ctx.clip(self.options.http_timeout);
        disposable::check_disposable(self.list.as_ref(), &address, Some(http_timeout))?;

        checkpoint(ctx)?;
        debug!(email, domain, "resolving mail exchangers");
        let mx = dns::resolve_exchange(self.lookup.as_ref(), domain)?;

        checkpoint(ctx)?;
        debug!(email, host = %mx.exchange, preference = mx.preference, "probing mail exchanger");
        let transcript = smtp::probe(
            &ProbeTarget {
                host: &mx.exchange,
                port: self.options.smtp_port,
            },
            &Envelope {
                helo: self.options.helo_name(),
                mail_from: &self.options.mail_from,
                rcpt_to: &address.address,
            },
            ProbeTimeouts {
                connect: ctx.clip(self.options.connect_timeout),
                command: ctx.clip(self.options.command_timeout),
            },
        )?;

        Ok(Verification {
            email: address.address,
            domain: address.domain,
            ascii_domain: address.ascii_domain,
            nameservers,
            mx,
            transcript,
        })
    }
}

fn checkpoint(ctx: &Context) -> Result<(), VerifyError> {
    match ctx.err() {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}
