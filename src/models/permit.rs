use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Canonical permit record every source is normalized into.
///
/// Plain-string fields default to `""` when the source has no value — never
/// null — so downstream consumers can rely on string-typed presence.
/// `issue_date` holds either an ISO `YYYY-MM-DD` date or, when the source
/// string could not be parsed, the original string verbatim.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermitRecord {
    pub permit_number: String,
    pub issue_date: Option<String>,
    pub work_class: String,
    pub description: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub contractor: String,
    pub owner: String,
    pub estimated_value: Option<f64>,
    pub source_name: String,
    pub hash_id: String,
    pub scraped_at: String,
}

/// Column order for tabular output. Matches the struct field order.
pub const COLUMNS: &[&str] = &[
    "permit_number",
    "issue_date",
    "work_class",
    "description",
    "address",
    "city",
    "state",
    "zip",
    "contractor",
    "owner",
    "estimated_value",
    "source_name",
    "hash_id",
    "scraped_at",
];

impl PermitRecord {
    /// Derives the duplicate-detection fingerprint: SHA-256 over
    /// permit number, address and source name, truncated to 16 hex chars.
    ///
    /// `source_name` is part of the identity on purpose: the same permit
    /// number and address seen through two different sources are two
    /// distinct records, not duplicates.
    pub fn compute_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.permit_number.as_bytes());
        hasher.update(b"|");
        hasher.update(self.address.as_bytes());
        hasher.update(b"|");
        hasher.update(self.source_name.as_bytes());
        let digest = hasher.finalize();
        let hex = format!("{digest:x}");
        hex[..16].to_string()
    }

    /// Field values in [`COLUMNS`] order, rendered for tabular output.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.permit_number.clone(),
            self.issue_date.clone().unwrap_or_default(),
            self.work_class.clone(),
            self.description.clone(),
            self.address.clone(),
            self.city.clone(),
            self.state.clone(),
            self.zip.clone(),
            self.contractor.clone(),
            self.owner.clone(),
            self.estimated_value.map(|v| v.to_string()).unwrap_or_default(),
            self.source_name.clone(),
            self.hash_id.clone(),
            self.scraped_at.clone(),
        ]
    }
}
