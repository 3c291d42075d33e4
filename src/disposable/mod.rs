//! Disposable-domain blacklist (stage 3).
//!
//! The list is fetched on every verification and never cached. Membership is
//! exact, case-insensitive equality: `sub.example.com` does not match an entry
//! for `example.com`, nor the other way round.

use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::debug;

use crate::error::VerifyError;
use crate::syntax::ParsedAddress;

/// Source of the disposable-domain list.
pub trait DisposableDomains {
    /// Fetches the current list. `timeout` bounds the whole request when set.
    fn fetch(&self, timeout: Option<Duration>) -> Result<Vec<String>, VerifyError>;
}

impl<T: DisposableDomains + ?Sized> DisposableDomains for Arc<T> {
    fn fetch(&self, timeout: Option<Duration>) -> Result<Vec<String>, VerifyError> {
        (**self).fetch(timeout)
    }
}

/// Fetches a JSON array of domain names over HTTP.
#[derive(Debug, Clone)]
pub struct HttpDisposableList {
    client: Client,
    url: String,
}

impl HttpDisposableList {
    pub fn new(url: impl Into<String>) -> Result<Self, VerifyError> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| VerifyError::ListFetch { source })?;
        Ok(Self::with_client(client, url))
    }

    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

impl DisposableDomains for HttpDisposableList {
    fn fetch(&self, timeout: Option<Duration>) -> Result<Vec<String>, VerifyError> {
        let mut request = self.client.get(&self.url);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|source| VerifyError::ListFetch { source })?;
        let body = response
            .bytes()
            .map_err(|source| VerifyError::ListFetch { source })?;
        let domains: Vec<String> =
            serde_json::from_slice(&body).map_err(|source| VerifyError::ListDecode { source })?;
        debug!(url = %self.url, entries = domains.len(), "disposable list fetched");
        Ok(domains)
    }
}

/// `true` when `domain` equals one of `list`, ignoring ASCII case.
pub fn is_disposable<S: AsRef<str>>(domain: &str, list: &[S]) -> bool {
    list.iter()
        .any(|entry| entry.as_ref().trim().eq_ignore_ascii_case(domain))
}

pub(crate) fn check_disposable<D>(
    source: &D,
    address: &ParsedAddress,
    timeout: Option<Duration>,
) -> Result<(), VerifyError>
where
    D: DisposableDomains + ?Sized,
{
    let list = source.fetch(timeout)?;
    if is_disposable(&address.domain, &list) || is_disposable(&address.ascii_domain, &list) {
        return Err(VerifyError::DisposableEmail {
            domain: address.domain.clone(),
        });
    }
    Ok(())
}
