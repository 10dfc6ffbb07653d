//! Candidate selector: filter, score and tie-break the catalog for one slot.

use std::cmp::Ordering;
use std::collections::HashSet;

use editorial_catalog::{AssetCatalog, AssetQuery};
use editorial_core::config::SelectionConfig;
use editorial_core::types::{Asset, AssetId, Season, TenantId};
use editorial_core::EditorialResult;
use editorial_feedback::ScoreWeights;
use tracing::{debug, warn};

use crate::scorer::AssetScorer;
use crate::types::{Alternative, ScoreBreakdown, SelectionRationale, Slot};

/// Winning asset and how it was chosen.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub asset: Asset,
    pub score: f64,
    pub rationale: SelectionRationale,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectionOutcome {
    Selected(Selection),
    /// Nothing survived filtering, even at the last cool-down tier.
    NoCandidate,
}

impl SelectionOutcome {
    pub fn selected(self) -> Option<Selection> {
        match self {
            SelectionOutcome::Selected(selection) => Some(selection),
            SelectionOutcome::NoCandidate => None,
        }
    }
}

struct Scored {
    asset: Asset,
    breakdown: ScoreBreakdown,
    total: f64,
}

/// Score descending, then usage ascending, then least recently used
/// (never-used first), then asset id.
fn rank(a: &Scored, b: &Scored) -> Ordering {
    b.total
        .total_cmp(&a.total)
        .then(a.asset.usage_count.cmp(&b.asset.usage_count))
        .then(a.asset.last_used_at.cmp(&b.asset.last_used_at))
        .then_with(|| a.asset.id.cmp(&b.asset.id))
}

/// Read-only over the catalog and one weights snapshot. Never mutates usage.
pub struct CandidateSelector<'a> {
    catalog: &'a dyn AssetCatalog,
    tenant_id: &'a TenantId,
    config: &'a SelectionConfig,
    weights: &'a ScoreWeights,
    alternatives: usize,
}

impl<'a> CandidateSelector<'a> {
    pub fn new(
        catalog: &'a dyn AssetCatalog,
        tenant_id: &'a TenantId,
        config: &'a SelectionConfig,
        weights: &'a ScoreWeights,
    ) -> Self {
        Self {
            catalog,
            tenant_id,
            config,
            weights,
            alternatives: config.alternatives,
        }
    }

    pub fn with_alternatives(mut self, alternatives: usize) -> Self {
        self.alternatives = alternatives;
        self
    }

    /// Pick the best asset for `slot`, skipping everything in `exclude`.
    pub fn select(
        &self,
        slot: &Slot,
        season: Option<Season>,
        exclude: &HashSet<AssetId>,
    ) -> EditorialResult<SelectionOutcome> {
        let nominal = self.config.nominal_cooldown_days();

        for (tier, &cooldown) in self.config.cooldown_tiers_days.iter().enumerate() {
            let query = AssetQuery {
                category: slot.category,
                min_quality: slot.min_quality,
                seasons: season.map(|s| [s].into_iter().collect()),
                excluding_recent_days: cooldown,
                as_of: slot.date,
            };

            let candidates: Vec<Asset> = self
                .catalog
                .find(self.tenant_id, &query)?
                .into_iter()
                .filter(|asset| !exclude.contains(&asset.id))
                .collect();

            let relaxed = tier > 0;
            let Some(selection) = self.pick(slot, season, candidates, cooldown, relaxed) else {
                debug!(
                    tenant_id = %self.tenant_id,
                    date = %slot.date,
                    category = %slot.category,
                    cooldown,
                    "no candidate at cool-down tier"
                );
                continue;
            };

            if relaxed {
                metrics::counter!("selector.cooldown_relaxed").increment(1);
                warn!(
                    tenant_id = %self.tenant_id,
                    date = %slot.date,
                    category = %slot.category,
                    asset_id = %selection.asset.id,
                    nominal,
                    applied = cooldown,
                    "cool-down relaxed to fill slot"
                );
            }
            return Ok(SelectionOutcome::Selected(selection));
        }

        debug!(
            tenant_id = %self.tenant_id,
            date = %slot.date,
            category = %slot.category,
            min_quality = slot.min_quality,
            "no candidate for slot"
        );
        Ok(SelectionOutcome::NoCandidate)
    }

    fn pick(
        &self,
        slot: &Slot,
        season: Option<Season>,
        candidates: Vec<Asset>,
        cooldown: u32,
        relaxed: bool,
    ) -> Option<Selection> {
        let scorer = AssetScorer::new(self.config, self.weights);
        let considered = candidates.len();

        let mut scored: Vec<Scored> = candidates
            .into_iter()
            .map(|asset| {
                let breakdown = scorer.score(&asset, slot, season);
                Scored {
                    total: breakdown.total(),
                    asset,
                    breakdown,
                }
            })
            .collect();
        scored.sort_by(rank);

        let mut ranked = scored.into_iter();
        let winner = ranked.next()?;
        let alternatives = ranked
            .take(self.alternatives)
            .map(|s| Alternative {
                asset_id: s.asset.id,
                score: s.total,
            })
            .collect();

        debug!(
            tenant_id = %self.tenant_id,
            date = %slot.date,
            asset_id = %winner.asset.id,
            score = winner.total,
            considered,
            "candidate selected"
        );

        Some(Selection {
            score: winner.total,
            rationale: SelectionRationale {
                breakdown: winner.breakdown,
                cooldown_days_applied: cooldown,
                relaxed,
                candidates_considered: considered,
                alternatives,
                weights_version: self.weights.version,
            },
            asset: winner.asset,
        })
    }
}
