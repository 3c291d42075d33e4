use crate::dns::MxRecord;
use crate::smtp::SmtpEvent;

/// Evidence gathered by a successful verification.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub email: String,
    pub domain: String,
    pub ascii_domain: String,
    pub nameservers: Vec<String>,
    /// The exchange the probe talked to.
    pub mx: MxRecord,
    pub transcript: Vec<SmtpEvent>,
}
