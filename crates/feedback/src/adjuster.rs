//! Outcome feedback adjuster: turns measured engagement into bounded weight
//! updates. The only writer of [`ScoreWeights`].

use std::collections::HashSet;
use std::sync::Arc;

use editorial_catalog::AssetCatalog;
use editorial_core::types::{EntryStatus, PerformanceRecord, RecordId, TenantId};
use editorial_core::{CancelFlag, EditorialError, EditorialResult, TenantContext};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::baseline::trailing_average;
use crate::weights::{LedgerEntry, ScoreWeights, WeightKey, WeightsStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedRecord {
    pub record_id: RecordId,
    pub reason: String,
}

/// Outcome of one `ingest` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    pub tenant_id: TenantId,
    /// Records that moved at least one weight.
    pub applied: usize,
    /// Records already present in the ledger (or repeated in the batch).
    pub replayed: usize,
    /// Records ledgered without an adjustment because no baseline existed yet.
    pub no_baseline: usize,
    pub skipped: Vec<SkippedRecord>,
    pub weights_version: u64,
    pub cancelled: bool,
}

impl IngestReport {
    fn new(tenant_id: TenantId, weights_version: u64) -> Self {
        Self {
            tenant_id,
            applied: 0,
            replayed: 0,
            no_baseline: 0,
            skipped: Vec::new(),
            weights_version,
            cancelled: false,
        }
    }

    fn skip(&mut self, record_id: &RecordId, reason: impl Into<String>) {
        self.skipped.push(SkippedRecord {
            record_id: record_id.clone(),
            reason: reason.into(),
        });
    }

    fn ledgered(&self) -> usize {
        self.applied + self.no_baseline
    }
}

pub struct OutcomeFeedbackAdjuster {
    catalog: Arc<dyn AssetCatalog>,
    store: Arc<dyn WeightsStore>,
}

impl OutcomeFeedbackAdjuster {
    pub fn new(catalog: Arc<dyn AssetCatalog>, store: Arc<dyn WeightsStore>) -> Self {
        Self { catalog, store }
    }

    /// Ingest a batch of performance records for one tenant.
    ///
    /// Records are processed in publication order so that earlier records of
    /// the batch feed the trailing average of later ones. A lost
    /// compare-and-swap reloads the weights and replays the whole batch.
    pub fn ingest(
        &self,
        ctx: &TenantContext,
        records: &[PerformanceRecord],
        cancel: &CancelFlag,
    ) -> EditorialResult<IngestReport> {
        let mut ordered: Vec<&PerformanceRecord> = records.iter().collect();
        ordered.sort_by(|a, b| {
            a.published_on
                .cmp(&b.published_on)
                .then_with(|| a.id.cmp(&b.id))
        });

        let mut attempt = 0;
        loop {
            attempt += 1;
            let base = self.store.load(&ctx.tenant_id)?;
            let (weights, mut report) = self.apply(ctx, base, &ordered, cancel)?;

            if report.ledgered() == 0 {
                debug!(tenant_id = %ctx.tenant_id, "no new records, weights left untouched");
                self.record_metrics(&report);
                return Ok(report);
            }

            match self.store.store(weights) {
                Ok(version) => {
                    report.weights_version = version;
                    info!(
                        tenant_id = %ctx.tenant_id,
                        applied = report.applied,
                        replayed = report.replayed,
                        no_baseline = report.no_baseline,
                        skipped = report.skipped.len(),
                        version,
                        "feedback ingested"
                    );
                    self.record_metrics(&report);
                    return Ok(report);
                }
                Err(EditorialError::StaleWeights { expected, actual, .. })
                    if attempt <= ctx.feedback.max_store_retries =>
                {
                    warn!(
                        tenant_id = %ctx.tenant_id,
                        expected,
                        actual,
                        attempt,
                        "weights changed underneath ingestion, retrying"
                    );
                    metrics::counter!("feedback.store_retries").increment(1);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Apply the records to a copy of the weights. Pure apart from catalog reads.
    fn apply(
        &self,
        ctx: &TenantContext,
        mut weights: ScoreWeights,
        records: &[&PerformanceRecord],
        cancel: &CancelFlag,
    ) -> EditorialResult<(ScoreWeights, IngestReport)> {
        let config = &ctx.feedback;
        let mut report = IngestReport::new(ctx.tenant_id.clone(), weights.version);
        let mut seen: HashSet<&RecordId> = HashSet::new();

        for record in records {
            if cancel.is_cancelled() {
                report.cancelled = true;
                warn!(tenant_id = %ctx.tenant_id, "ingestion cancelled");
                break;
            }

            if weights.has_record(&record.id) || !seen.insert(&record.id) {
                report.replayed += 1;
                continue;
            }

            if record.entry_status != EntryStatus::Measured {
                report.skip(
                    &record.id,
                    format!("entry status is {:?}, not measured", record.entry_status),
                );
                continue;
            }

            let rate = match validate_rate(record, config.max_engagement_rate) {
                Ok(rate) => rate,
                Err(e) => {
                    report.skip(&record.id, e.to_string());
                    continue;
                }
            };

            let Some(asset) = self.catalog.get(&ctx.tenant_id, &record.asset_id)? else {
                report.skip(&record.id, format!("unknown asset {}", record.asset_id));
                continue;
            };

            let baseline =
                trailing_average(&weights.ledger, record.published_on, asset.category, config);

            weights.ledger.insert(
                record.id.clone(),
                LedgerEntry {
                    published_on: record.published_on,
                    category: asset.category,
                    engagement_rate: rate,
                },
            );

            let Some(average) = baseline else {
                report.no_baseline += 1;
                continue;
            };

            let step = if rate > average {
                config.positive_step
            } else {
                -config.negative_step
            };
            let delta = step.clamp(config.min_adjustment, config.max_adjustment);

            for key in WeightKey::for_asset(&asset) {
                let value =
                    weights.adjust(key.clone(), delta, config.weight_min, config.weight_max);
                debug!(record_id = %record.id, %key, delta, value, "weight adjusted");
            }
            report.applied += 1;
        }

        Ok((weights, report))
    }

    fn record_metrics(&self, report: &IngestReport) {
        metrics::counter!("feedback.applied").increment(report.applied as u64);
        metrics::counter!("feedback.skipped").increment(report.skipped.len() as u64);
        metrics::counter!("feedback.replayed").increment(report.replayed as u64);
    }
}

/// The record's engagement rate, or the reason it cannot be trusted.
fn validate_rate(record: &PerformanceRecord, max_rate: f64) -> EditorialResult<f64> {
    let out_of_range = |reason: String| EditorialError::OutOfRangeAdjustment {
        record_id: record.id.clone(),
        reason,
    };

    let m = &record.metrics;
    if [m.likes, m.comments, m.saves, m.shares, m.reach, m.impressions]
        .iter()
        .any(|v| *v < 0)
    {
        return Err(out_of_range("negative engagement counter".to_string()));
    }

    let rate = record
        .engagement_rate()
        .ok_or_else(|| out_of_range("no engagement rate and zero reach".to_string()))?;
    if !rate.is_finite() || !(0.0..=max_rate).contains(&rate) {
        return Err(out_of_range(format!(
            "engagement rate {rate} outside [0, {max_rate}]"
        )));
    }
    Ok(rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weights::InMemoryWeightsStore;
    use chrono::NaiveDate;
    use editorial_catalog::InMemoryCatalog;
    use editorial_core::config::FeedbackConfig;
    use editorial_core::types::{
        Asset, AssetId, AssetStatus, Category, EngagementMetrics, MediaType,
    };
    use std::sync::atomic::{AtomicBool, Ordering};
    use uuid::Uuid;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 7, d).unwrap()
    }

    fn destination() -> Asset {
        Asset {
            id: AssetId::new("dest-1"),
            category: Category::Destination,
            subcategory: "old_town".into(),
            ambiance: ["sunny".to_string()].into_iter().collect(),
            seasons: Default::default(),
            elements: ["sea".to_string(), "boat".to_string()].into_iter().collect(),
            quality: 9,
            usage_count: 1,
            last_used_at: None,
            status: AssetStatus::Used,
            aspect_ratio: Some("4:5".into()),
            media_type: MediaType::Image,
        }
    }

    fn record(id: &str, d: u32, rate: f64) -> PerformanceRecord {
        PerformanceRecord {
            id: RecordId::new(id),
            entry_id: Uuid::nil(),
            asset_id: AssetId::new("dest-1"),
            published_on: day(d),
            entry_status: EntryStatus::Measured,
            metrics: EngagementMetrics::default(),
            engagement_rate: Some(rate),
        }
    }

    fn setup(
        feedback: FeedbackConfig,
    ) -> (TenantContext, Arc<InMemoryWeightsStore>, OutcomeFeedbackAdjuster) {
        let mut ctx = TenantContext::with_defaults("hotel-riviera");
        ctx.feedback = feedback;
        let catalog = Arc::new(InMemoryCatalog::new());
        catalog.upsert(&ctx.tenant_id, destination());
        let store = Arc::new(InMemoryWeightsStore::new());
        let adjuster = OutcomeFeedbackAdjuster::new(catalog, store.clone());
        (ctx, store, adjuster)
    }

    fn sunny_sea() -> WeightKey {
        WeightKey::new(Category::Destination, Some("sunny"), Some("sea"))
    }

    #[test]
    fn test_far_above_baseline_raises_weights_up_to_max() {
        let (ctx, store, adjuster) = setup(FeedbackConfig {
            baseline_engagement_rate: Some(0.02),
            weight_max: 1.0,
            ..FeedbackConfig::default()
        });

        let mut seeded = ScoreWeights::empty(ctx.tenant_id.clone());
        seeded.entries.insert(sunny_sea(), 0.8);
        store.restore(seeded);

        let report = adjuster
            .ingest(&ctx, &[record("r-1", 10, 0.12)], &CancelFlag::new())
            .unwrap();
        assert_eq!(report.applied, 1);
        assert_eq!(report.weights_version, 1);

        let weights = store.load(&ctx.tenant_id).unwrap();
        assert_eq!(weights.get(&sunny_sea()), 1.0);
        let boat = WeightKey::new(Category::Destination, Some("sunny"), Some("boat"));
        assert_eq!(weights.get(&boat), 0.5);
    }

    #[test]
    fn test_below_baseline_penalty_is_smaller() {
        let (ctx, store, adjuster) = setup(FeedbackConfig {
            baseline_engagement_rate: Some(0.05),
            ..FeedbackConfig::default()
        });

        adjuster
            .ingest(&ctx, &[record("r-1", 10, 0.05)], &CancelFlag::new())
            .unwrap();
        let weights = store.load(&ctx.tenant_id).unwrap();
        // At the average counts as not above it.
        assert!((weights.get(&sunny_sea()) + 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_replayed_records_are_noops() {
        let (ctx, store, adjuster) = setup(FeedbackConfig {
            baseline_engagement_rate: Some(0.02),
            ..FeedbackConfig::default()
        });
        let batch = [record("r-1", 10, 0.10)];

        adjuster.ingest(&ctx, &batch, &CancelFlag::new()).unwrap();
        let first = store.load(&ctx.tenant_id).unwrap();

        let report = adjuster.ingest(&ctx, &batch, &CancelFlag::new()).unwrap();
        assert_eq!(report.replayed, 1);
        assert_eq!(report.applied, 0);
        assert_eq!(report.weights_version, first.version);
        assert_eq!(store.load(&ctx.tenant_id).unwrap(), first);
    }

    #[test]
    fn test_duplicate_in_batch_counts_once() {
        let (ctx, store, adjuster) = setup(FeedbackConfig {
            baseline_engagement_rate: Some(0.02),
            ..FeedbackConfig::default()
        });
        let report = adjuster
            .ingest(
                &ctx,
                &[record("r-1", 10, 0.10), record("r-1", 10, 0.10)],
                &CancelFlag::new(),
            )
            .unwrap();
        assert_eq!(report.applied, 1);
        assert_eq!(report.replayed, 1);
        assert_eq!(store.load(&ctx.tenant_id).unwrap().get(&sunny_sea()), 0.5);
    }

    #[test]
    fn test_invalid_records_are_skipped_with_reasons() {
        let (ctx, store, adjuster) = setup(FeedbackConfig {
            baseline_engagement_rate: Some(0.02),
            ..FeedbackConfig::default()
        });

        let unmeasured = PerformanceRecord {
            entry_status: EntryStatus::Published,
            ..record("r-unmeasured", 10, 0.1)
        };
        let too_high = record("r-high", 10, 1.5);
        let negative = PerformanceRecord {
            metrics: EngagementMetrics {
                likes: -3,
                reach: 100,
                ..EngagementMetrics::default()
            },
            engagement_rate: None,
            ..record("r-negative", 10, 0.0)
        };
        let unknown = PerformanceRecord {
            asset_id: AssetId::new("missing"),
            ..record("r-unknown", 10, 0.1)
        };
        let nan = record("r-nan", 10, f64::NAN);

        let report = adjuster
            .ingest(&ctx, &[unmeasured, too_high, negative, unknown, nan], &CancelFlag::new())
            .unwrap();

        assert_eq!(report.applied, 0);
        assert_eq!(report.skipped.len(), 5);
        let reason = |id: &str| {
            report
                .skipped
                .iter()
                .find(|s| s.record_id.as_str() == id)
                .map(|s| s.reason.clone())
                .unwrap()
        };
        assert!(reason("r-unmeasured").contains("not measured"));
        assert!(reason("r-high").contains("Out-of-range"));
        assert!(reason("r-negative").contains("negative"));
        assert!(reason("r-unknown").contains("unknown asset"));
        assert!(reason("r-nan").contains("Out-of-range"));
        // Nothing ledgered, nothing stored.
        assert_eq!(store.load(&ctx.tenant_id).unwrap().version, 0);
    }

    #[test]
    fn test_first_record_seeds_the_baseline() {
        let (ctx, store, adjuster) = setup(FeedbackConfig::default());

        let report = adjuster
            .ingest(
                &ctx,
                &[record("r-2", 12, 0.09), record("r-1", 10, 0.03)],
                &CancelFlag::new(),
            )
            .unwrap();

        // r-1 is processed first, has no history, and becomes r-2's baseline.
        assert_eq!(report.no_baseline, 1);
        assert_eq!(report.applied, 1);
        let weights = store.load(&ctx.tenant_id).unwrap();
        assert_eq!(weights.ledger.len(), 2);
        assert_eq!(weights.get(&sunny_sea()), 0.5);
    }

    #[test]
    fn test_weights_stay_within_bounds() {
        let (ctx, store, adjuster) = setup(FeedbackConfig {
            baseline_engagement_rate: Some(0.01),
            positive_step: 2.0,
            negative_step: 0.5,
            max_adjustment: 0.75,
            weight_max: 2.0,
            ..FeedbackConfig::default()
        });

        let batch: Vec<_> = (1..=6)
            .map(|i| record(&format!("r-{i}"), i, 0.5 + f64::from(i) / 100.0))
            .collect();
        adjuster.ingest(&ctx, &batch, &CancelFlag::new()).unwrap();

        let weights = store.load(&ctx.tenant_id).unwrap();
        assert!(weights.entries.values().all(|w| *w <= 2.0));
        assert_eq!(weights.get(&sunny_sea()), 2.0);
    }

    #[test]
    fn test_tenants_do_not_share_weights() {
        let (ctx, store, adjuster) = setup(FeedbackConfig {
            baseline_engagement_rate: Some(0.02),
            ..FeedbackConfig::default()
        });
        adjuster
            .ingest(&ctx, &[record("r-1", 10, 0.2)], &CancelFlag::new())
            .unwrap();

        let other = store.load(&TenantId::new("hotel-alps")).unwrap();
        assert!(other.entries.is_empty());
        assert!(other.ledger.is_empty());
    }

    #[test]
    fn test_cancelled_before_start_stores_nothing() {
        let (ctx, store, adjuster) = setup(FeedbackConfig {
            baseline_engagement_rate: Some(0.02),
            ..FeedbackConfig::default()
        });
        let cancel = CancelFlag::new();
        cancel.cancel();

        let report = adjuster.ingest(&ctx, &[record("r-1", 10, 0.2)], &cancel).unwrap();
        assert!(report.cancelled);
        assert_eq!(report.applied, 0);
        assert_eq!(store.load(&ctx.tenant_id).unwrap().version, 0);
    }

    /// Lets another writer bump the version right before the first store.
    struct RacingStore {
        inner: InMemoryWeightsStore,
        raced: AtomicBool,
    }

    impl WeightsStore for RacingStore {
        fn load(&self, tenant: &TenantId) -> EditorialResult<ScoreWeights> {
            self.inner.load(tenant)
        }

        fn store(&self, weights: ScoreWeights) -> EditorialResult<u64> {
            if !self.raced.swap(true, Ordering::SeqCst) {
                let concurrent = self.inner.load(&weights.tenant_id)?;
                self.inner.store(concurrent)?;
            }
            self.inner.store(weights)
        }
    }

    #[test]
    fn test_stale_write_is_retried() {
        let mut ctx = TenantContext::with_defaults("hotel-riviera");
        ctx.feedback.baseline_engagement_rate = Some(0.02);
        let catalog = Arc::new(InMemoryCatalog::new());
        catalog.upsert(&ctx.tenant_id, destination());
        let store = Arc::new(RacingStore {
            inner: InMemoryWeightsStore::new(),
            raced: AtomicBool::new(false),
        });
        let adjuster = OutcomeFeedbackAdjuster::new(catalog, store.clone());

        let report = adjuster
            .ingest(&ctx, &[record("r-1", 10, 0.2)], &CancelFlag::new())
            .unwrap();
        assert_eq!(report.applied, 1);
        assert_eq!(report.weights_version, 2);
        assert_eq!(store.load(&ctx.tenant_id).unwrap().get(&sunny_sea()), 0.5);
    }
}
