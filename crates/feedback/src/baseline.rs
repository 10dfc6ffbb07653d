//! Trailing engagement baseline used to judge a new performance record.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use editorial_core::config::{AveragingMethod, BaselineScope, FeedbackConfig};
use editorial_core::types::{Category, RecordId};

use crate::weights::LedgerEntry;

/// Average engagement of ledger entries published in
/// `[as_of - lookback_days, as_of)`, falling back to the configured baseline.
pub fn trailing_average(
    ledger: &BTreeMap<RecordId, LedgerEntry>,
    as_of: NaiveDate,
    category: Category,
    config: &FeedbackConfig,
) -> Option<f64> {
    let window_start = as_of
        .checked_sub_days(Days::new(u64::from(config.lookback_days)))
        .unwrap_or(NaiveDate::MIN);

    let mut rates: Vec<f64> = ledger
        .values()
        .filter(|e| e.published_on >= window_start && e.published_on < as_of)
        .filter(|e| match config.scope {
            BaselineScope::Tenant => true,
            BaselineScope::Category => e.category == category,
        })
        .map(|e| e.engagement_rate)
        .collect();

    if rates.is_empty() {
        return config.baseline_engagement_rate;
    }

    match config.averaging {
        AveragingMethod::Mean => Some(rates.iter().sum::<f64>() / rates.len() as f64),
        AveragingMethod::Median => {
            rates.sort_by(f64::total_cmp);
            let mid = rates.len() / 2;
            if rates.len() % 2 == 0 {
                Some((rates[mid - 1] + rates[mid]) / 2.0)
            } else {
                Some(rates[mid])
            }
        }
    }
}
