//! Nameserver and mail-exchanger lookups (stages 2 and 4).
//!
//! Queries go through the [`Lookup`] trait so the pipeline can run against
//! the system resolver or a stub.

mod resolver;
mod types;

pub use resolver::{Lookup, build_resolver};
pub use types::{MxRecord, preferred_exchange};

use crate::error::VerifyError;

/// Fails unless `domain` has at least one NS record.
pub(crate) fn check_nameservers<L>(lookup: &L, domain: &str) -> Result<Vec<String>, VerifyError>
where
    L: Lookup + ?Sized,
{
    let nameservers = lookup
        .ns_lookup(domain)
        .map_err(|err| VerifyError::ns_lookup(domain, err))?;
    if nameservers.is_empty() {
        return Err(VerifyError::NoNameservers {
            domain: domain.to_string(),
        });
    }
    Ok(nameservers)
}

/// Resolves MX records for `domain` and picks the preferred exchange.
pub(crate) fn resolve_exchange<L>(lookup: &L, domain: &str) -> Result<MxRecord, VerifyError>
where
    L: Lookup + ?Sized,
{
    let records = lookup
        .mx_lookup(domain)
        .map_err(|err| VerifyError::mx_lookup(domain, err))?;
    preferred_exchange(&records)
        .cloned()
        .ok_or_else(|| VerifyError::NoMxRecords {
            domain: domain.to_string(),
        })
}
