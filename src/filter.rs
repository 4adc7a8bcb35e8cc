use std::collections::HashSet;

use chrono::{Duration, NaiveDate, Utc};

use crate::models::PermitRecord;

/// Date threshold below which dated records are excluded.
///
/// The bias is toward false inclusion: a record with no `issue_date`, or one
/// whose date never normalized to ISO, is always kept. Only records that are
/// confidently older than the cutoff are dropped.
#[derive(Debug, Clone, Copy)]
pub struct DateCutoff {
    cutoff: NaiveDate,
}

impl DateCutoff {
    pub fn days_back(days: i64) -> Self {
        Self {
            cutoff: Utc::now().date_naive() - Duration::days(days),
        }
    }

    #[cfg(test)]
    fn at(cutoff: NaiveDate) -> Self {
        Self { cutoff }
    }

    pub fn keeps(&self, record: &PermitRecord) -> bool {
        let Some(issue_date) = &record.issue_date else {
            return true;
        };
        match NaiveDate::parse_from_str(issue_date, "%Y-%m-%d") {
            Ok(date) => date >= self.cutoff,
            // Raw unparsed string preserved by the normalizer; keep it.
            Err(_) => true,
        }
    }
}

/// Collapses records with identical hash identity, keeping the first seen.
/// Field values of later duplicates are discarded, never merged.
pub fn dedupe(records: Vec<PermitRecord>) -> Vec<PermitRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(record.hash_id.clone()))
        .collect()
}
