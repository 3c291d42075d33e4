#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MxRecord {
    pub exchange: String,
    pub preference: u16,
}

impl MxRecord {
    pub fn new(exchange: impl Into<String>, preference: u16) -> Self {
        Self {
            exchange: exchange.into(),
            preference,
        }
    }

    /// A null MX (RFC 7505) advertises "." which normalises to an empty name.
    pub fn is_null(&self) -> bool {
        self.exchange.is_empty()
    }
}

/// Returns the record with the lowest preference. Ties keep the record seen
/// first; null MX entries are never selected.
pub fn preferred_exchange(records: &[MxRecord]) -> Option<&MxRecord> {
    records
        .iter()
        .filter(|record| !record.is_null())
        .min_by_key(|record| record.preference)
}
