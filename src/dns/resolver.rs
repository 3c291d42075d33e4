use std::sync::Arc;

use trust_dns_resolver::Resolver;
use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};

use super::MxRecord;
use crate::error::VerifyError;

/// Builds a blocking resolver from the host configuration (`/etc/resolv.conf`).
pub fn build_resolver() -> Result<Resolver, VerifyError> {
    Resolver::from_system_conf().map_err(|source| VerifyError::ResolverInit { source })
}

/// DNS queries needed by the pipeline.
pub trait Lookup {
    /// Nameserver host names for `domain`. Every failure, NXDOMAIN included,
    /// is returned as an error.
    fn ns_lookup(&self, domain: &str) -> Result<Vec<String>, ResolveError>;

    /// MX records for `domain` in answer order. A domain without MX records
    /// yields an empty list.
    fn mx_lookup(&self, domain: &str) -> Result<Vec<MxRecord>, ResolveError>;
}

impl<T: Lookup + ?Sized> Lookup for Arc<T> {
    fn ns_lookup(&self, domain: &str) -> Result<Vec<String>, ResolveError> {
        (**self).ns_lookup(domain)
    }

    fn mx_lookup(&self, domain: &str) -> Result<Vec<MxRecord>, ResolveError> {
        (**self).mx_lookup(domain)
    }
}

impl Lookup for Resolver {
    fn ns_lookup(&self, domain: &str) -> Result<Vec<String>, ResolveError> {
        let lookup = Resolver::ns_lookup(self, domain)?;
        Ok(lookup
            .iter()
            .map(|ns| normalize_name(ns.to_utf8()))
            .collect())
    }

    fn mx_lookup(&self, domain: &str) -> Result<Vec<MxRecord>, ResolveError> {
        let lookup = match Resolver::mx_lookup(self, domain) {
            Ok(lookup) => lookup,
            Err(err) if matches!(err.kind(), ResolveErrorKind::NoRecordsFound { .. }) => {
                return Ok(Vec::new());
            }
            Err(err) => return Err(err),
        };
        Ok(lookup
            .iter()
            .map(|mx| MxRecord::new(normalize_name(mx.exchange().to_utf8()), mx.preference()))
            .collect())
    }
}

pub(crate) fn normalize_name(name: String) -> String {
    name.trim_end_matches('.').to_ascii_lowercase()
}
