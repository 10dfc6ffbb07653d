//! Schedule builder: walks a date range and fills every resolved slot.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use editorial_catalog::AssetCatalog;
use editorial_core::types::{AssetId, EntryStatus, TenantId};
use editorial_core::{EditorialError, EditorialResult, TenantContext};
use editorial_feedback::WeightsStore;
use editorial_rules::RuleSet;
use tracing::{debug, info, warn};

use crate::selector::{CandidateSelector, SelectionOutcome};
use crate::types::{
    BuildOptions, ScheduleEntry, ScheduleOutcome, Slot, UnfilledReason, UnfilledSlot,
};

/// Plans one tenant's schedule from that tenant's rule set.
pub struct ScheduleBuilder {
    pub(crate) tenant_id: TenantId,
    pub(crate) catalog: Arc<dyn AssetCatalog>,
    pub(crate) weights: Arc<dyn WeightsStore>,
    pub(crate) rules: RuleSet,
}

impl ScheduleBuilder {
    pub fn new(
        tenant_id: TenantId,
        catalog: Arc<dyn AssetCatalog>,
        weights: Arc<dyn WeightsStore>,
        rules: RuleSet,
    ) -> Self {
        Self {
            tenant_id,
            catalog,
            weights,
            rules,
        }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    /// The rule set belongs to one tenant; any other context is refused.
    pub(crate) fn ensure_tenant(&self, ctx: &TenantContext) -> EditorialResult<()> {
        if ctx.tenant_id != self.tenant_id {
            return Err(EditorialError::config(format!(
                "schedule builder for tenant {} cannot serve tenant {}",
                self.tenant_id, ctx.tenant_id
            )));
        }
        Ok(())
    }

    /// Plan every slot between `start` and `end` (inclusive).
    ///
    /// Slots that cannot be filled, and dates whose configuration is broken,
    /// are reported in `unfilled`; everything else is planned. Only failures
    /// of the catalog or weights store abort the whole build.
    pub fn build(
        &self,
        ctx: &TenantContext,
        start: NaiveDate,
        end: NaiveDate,
        options: &BuildOptions,
    ) -> EditorialResult<ScheduleOutcome> {
        self.ensure_tenant(ctx)?;
        if end < start {
            return Err(EditorialError::config(format!(
                "schedule range ends ({end}) before it starts ({start})"
            )));
        }

        let weights = self.weights.load(&ctx.tenant_id)?;
        let selector = CandidateSelector::new(
            self.catalog.as_ref(),
            &ctx.tenant_id,
            &ctx.selection,
            &weights,
        )
        .with_alternatives(options.alternatives.unwrap_or(ctx.selection.alternatives));

        info!(
            tenant_id = %ctx.tenant_id,
            %start,
            %end,
            weights_version = weights.version,
            "building schedule"
        );

        let mut outcome = ScheduleOutcome {
            tenant_id: ctx.tenant_id.clone(),
            start_date: start,
            end_date: end,
            entries: Vec::new(),
            unfilled: Vec::new(),
            skipped_existing: 0,
            weights_version: weights.version,
            cancelled: false,
        };
        let mut exclude = options.exclude.clone();

        for date in start.iter_days().take_while(|d| *d <= end) {
            if options.cancel.is_cancelled() {
                outcome.cancelled = true;
                break;
            }
            self.plan_date(ctx, date, &selector, options, &mut exclude, &mut outcome)?;
            if outcome.cancelled {
                break;
            }
        }

        metrics::counter!("schedule.entries_planned").increment(outcome.entries.len() as u64);
        if outcome.cancelled {
            warn!(
                tenant_id = %ctx.tenant_id,
                planned = outcome.entries.len(),
                "schedule build cancelled, returning partial plan"
            );
        }
        if let Some(warning) = outcome.warning() {
            metrics::counter!("schedule.unfilled_slots").increment(warning.unfilled.len() as u64);
            warn!(tenant_id = %ctx.tenant_id, %warning, "partial schedule");
        }
        info!(
            tenant_id = %ctx.tenant_id,
            planned = outcome.entries.len(),
            unfilled = outcome.unfilled.len(),
            skipped_existing = outcome.skipped_existing,
            "schedule built"
        );
        Ok(outcome)
    }

    fn plan_date(
        &self,
        ctx: &TenantContext,
        date: NaiveDate,
        selector: &CandidateSelector<'_>,
        options: &BuildOptions,
        exclude: &mut HashSet<AssetId>,
        outcome: &mut ScheduleOutcome,
    ) -> EditorialResult<()> {
        let resolved = self
            .rules
            .resolve_slots(date)
            .and_then(|rules| Ok((rules, self.rules.active_theme(date)?)));
        let (rules, theme) = match resolved {
            Ok(resolved) => resolved,
            Err(e) if e.is_local() => {
                warn!(tenant_id = %ctx.tenant_id, %date, error = %e, "date skipped");
                outcome.unfilled.push(UnfilledSlot {
                    date,
                    slot_index: None,
                    category: None,
                    reason: UnfilledReason::Configuration {
                        message: e.to_string(),
                    },
                });
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        let season = self.rules.season_for(date);

        for rule in rules {
            if options.cancel.is_cancelled() {
                outcome.cancelled = true;
                return Ok(());
            }
            if !options.overwrite && options.existing.contains(&(date, rule.slot_index)) {
                debug!(%date, slot_index = rule.slot_index, "slot already planned");
                outcome.skipped_existing += 1;
                continue;
            }

            let slot = Slot::from_rule(date, rule, theme, ctx.selection.min_quality);
            match selector.select(&slot, season, exclude)? {
                SelectionOutcome::Selected(selection) => {
                    exclude.insert(selection.asset.id.clone());
                    outcome.entries.push(ScheduleEntry {
                        id: ScheduleEntry::entry_id(&ctx.tenant_id, date, slot.slot_index),
                        tenant_id: ctx.tenant_id.clone(),
                        asset_id: selection.asset.id,
                        expected_usage_count: selection.asset.usage_count,
                        score: selection.score,
                        rationale: selection.rationale,
                        season,
                        status: EntryStatus::Planned,
                        slot,
                    });
                }
                SelectionOutcome::NoCandidate => {
                    outcome.unfilled.push(UnfilledSlot {
                        date,
                        slot_index: Some(slot.slot_index),
                        category: Some(slot.category),
                        reason: UnfilledReason::NoCandidate {
                            category: slot.category,
                            min_quality: slot.min_quality,
                        },
                    });
                }
            }
        }
        Ok(())
    }
}
