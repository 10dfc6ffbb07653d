//! Usage commit for planned entries, re-selecting when the chosen asset was
//! taken by a concurrent run.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use editorial_catalog::{CommitReceipt, CommitRequest};
use editorial_core::types::{AssetId, EntryStatus};
use editorial_core::{EditorialError, EditorialResult, TenantContext};
use tracing::{info, warn};

use crate::builder::ScheduleBuilder;
use crate::selector::{CandidateSelector, SelectionOutcome};
use crate::types::ScheduleEntry;

impl ScheduleBuilder {
    /// Record `entry`'s asset as used in the catalog.
    ///
    /// Only validated or scheduled entries can be committed; a validated entry
    /// moves to `scheduled`. When the asset was committed elsewhere since
    /// selection, the slot is re-selected without it (and without `planned`,
    /// the assets held by the run's other entries) up to
    /// `commit.max_attempts` times. A slot already committed with a different
    /// asset, e.g. after an overwrite re-plan, fails at once with
    /// `SlotAlreadyCommitted`.
    pub fn commit(
        &self,
        ctx: &TenantContext,
        entry: &mut ScheduleEntry,
        used_at: DateTime<Utc>,
        planned: &HashSet<AssetId>,
    ) -> EditorialResult<CommitReceipt> {
        self.ensure_tenant(ctx)?;
        if !matches!(entry.status, EntryStatus::Validated | EntryStatus::Scheduled) {
            return Err(EditorialError::InvalidTransition {
                from: entry.status,
                to: EntryStatus::Scheduled,
            });
        }

        let mut exclude = planned.clone();
        exclude.remove(&entry.asset_id);

        let mut attempt = 0;
        loop {
            attempt += 1;
            let request = CommitRequest {
                asset_id: entry.asset_id.clone(),
                entry_id: entry.id,
                expected_usage_count: entry.expected_usage_count,
                used_at,
            };

            match self.catalog.commit_selection(&ctx.tenant_id, &request) {
                Ok(receipt) => {
                    if entry.status == EntryStatus::Validated {
                        entry.advance(EntryStatus::Scheduled)?;
                    }
                    return Ok(receipt);
                }
                Err(EditorialError::AlreadyCommitted { asset_id })
                    if attempt < ctx.commit.max_attempts =>
                {
                    warn!(
                        tenant_id = %ctx.tenant_id,
                        entry_id = %entry.id,
                        %asset_id,
                        attempt,
                        "asset taken since selection, re-selecting"
                    );
                    exclude.insert(asset_id.clone());
                    if !self.reselect(ctx, entry, &exclude)? {
                        return Err(EditorialError::AlreadyCommitted { asset_id });
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Replace the entry's selection. Returns false when no candidate remains.
    fn reselect(
        &self,
        ctx: &TenantContext,
        entry: &mut ScheduleEntry,
        exclude: &HashSet<AssetId>,
    ) -> EditorialResult<bool> {
        let weights = self.weights.load(&ctx.tenant_id)?;
        let selector = CandidateSelector::new(
            self.catalog.as_ref(),
            &ctx.tenant_id,
            &ctx.selection,
            &weights,
        );

        let selection = match selector.select(&entry.slot, entry.season, exclude)? {
            SelectionOutcome::Selected(selection) => selection,
            SelectionOutcome::NoCandidate => return Ok(false),
        };

        info!(
            tenant_id = %ctx.tenant_id,
            entry_id = %entry.id,
            previous = %entry.asset_id,
            replacement = %selection.asset.id,
            "entry re-selected"
        );
        entry.asset_id = selection.asset.id;
        entry.expected_usage_count = selection.asset.usage_count;
        entry.score = selection.score;
        entry.rationale = selection.rationale;
        Ok(true)
    }
}
