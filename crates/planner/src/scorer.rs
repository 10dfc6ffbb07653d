use editorial_core::config::SelectionConfig;
use editorial_core::types::{Asset, Season};
use editorial_feedback::ScoreWeights;

use crate::types::{ScoreBreakdown, Slot, ThemeContext};

/// Scores surviving candidates for one slot against a fixed weights snapshot.
#[derive(Debug, Clone, Copy)]
pub struct AssetScorer<'a> {
    config: &'a SelectionConfig,
    weights: &'a ScoreWeights,
}

impl<'a> AssetScorer<'a> {
    pub fn new(config: &'a SelectionConfig, weights: &'a ScoreWeights) -> Self {
        Self { config, weights }
    }

    /// Weighted score of `asset` for `slot`.
    ///
    /// ```text
    /// quality * W_q + 1/(1 + usage) * W_u + learned
    ///   + theme_affinity * W_t + exact_season * W_s + format_match * W_f
    /// ```
    pub fn score(&self, asset: &Asset, slot: &Slot, season: Option<Season>) -> ScoreBreakdown {
        let c = self.config;

        let season_match = match season {
            Some(s) if asset.seasons.contains(&s) => 1.0,
            _ => 0.0,
        };
        let format_match = match (slot.preferred_format, asset.aspect_ratio.as_deref()) {
            (Some(format), Some(aspect)) if format.accepts(aspect) => 1.0,
            _ => 0.0,
        };
        let affinity = slot
            .theme
            .as_ref()
            .map(|theme| theme_affinity(asset, theme))
            .unwrap_or(0.0);

        ScoreBreakdown {
            quality: f64::from(asset.quality) * c.quality_weight,
            usage: usage_penalty(asset.usage_count) * c.usage_weight,
            learned: self.weights.learned_bonus(asset),
            theme: affinity * c.theme_weight,
            season: season_match * c.season_weight,
            format: format_match * c.format_weight,
        }
    }
}

/// Decreasing in `usage_count`, 1.0 for a never-used asset.
pub fn usage_penalty(usage_count: u32) -> f64 {
    1.0 / (1.0 + f64::from(usage_count))
}

/// Share of the theme's preferred ambiances and elements the asset carries,
/// in `[0, 1]`. A theme without preferences favours no asset.
pub fn theme_affinity(asset: &Asset, theme: &ThemeContext) -> f64 {
    let wanted = theme.preferred_ambiances.len() + theme.preferred_elements.len();
    if wanted == 0 {
        return 0.0;
    }

    let hits = theme.preferred_ambiances.intersection(&asset.ambiance).count()
        + theme.preferred_elements.intersection(&asset.elements).count();
    hits as f64 / wanted as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use editorial_core::types::{AssetId, AssetStatus, Category, MediaType, PostFormat, TenantId};
    use editorial_feedback::WeightKey;
    use std::collections::BTreeSet;

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn asset() -> Asset {
        Asset {
            id: AssetId::new("t-1"),
            category: Category::Terrace,
            subcategory: "rooftop".into(),
            ambiance: set(&["sunset", "romantic"]),
            seasons: [Season::Summer].into_iter().collect(),
            elements: set(&["pool", "cocktail"]),
            quality: 8,
            usage_count: 1,
            last_used_at: None,
            status: AssetStatus::Used,
            aspect_ratio: Some("9:16".into()),
            media_type: MediaType::Image,
        }
    }

    fn theme() -> ThemeContext {
        ThemeContext {
            id: "summer-nights".into(),
            name: "Summer nights".into(),
            mood: "romantic".into(),
            cta_focus: "book_direct".into(),
            hashtags: vec![],
            preferred_ambiances: set(&["sunset", "lively"]),
            preferred_elements: set(&["cocktail", "music"]),
        }
    }

    fn slot(theme: Option<ThemeContext>, format: Option<PostFormat>) -> Slot {
        Slot {
            date: NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
            category: Category::Terrace,
            slot_index: 0,
            rule_id: "wed".into(),
            priority: 0,
            min_quality: 7,
            preferred_time: None,
            preferred_format: format,
            theme,
        }
    }

    #[test]
    fn test_usage_penalty_decreases() {
        assert_eq!(usage_penalty(0), 1.0);
        assert!(usage_penalty(1) > usage_penalty(2));
    }

    #[test]
    fn test_theme_affinity() {
        assert_eq!(theme_affinity(&asset(), &theme()), 0.5);

        // The mood names an ambiance the asset carries, but only explicit
        // preferences count.
        let mut mood_only = ThemeContext {
            preferred_ambiances: BTreeSet::new(),
            preferred_elements: BTreeSet::new(),
            ..theme()
        };
        mood_only.mood = asset().ambiance.iter().next().cloned().unwrap_or_default();
        assert_eq!(theme_affinity(&asset(), &mood_only), 0.0);
    }

    #[test]
    fn test_breakdown_terms() {
        let config = SelectionConfig::default();
        let mut weights = ScoreWeights::empty(TenantId::new("t"));
        weights.adjust(
            WeightKey::new(Category::Terrace, Some("sunset"), Some("pool")),
            0.5,
            -5.0,
            5.0,
        );
        let scorer = AssetScorer::new(&config, &weights);

        let themed_reel = slot(Some(theme()), Some(PostFormat::Reel));
        let b = scorer.score(&asset(), &themed_reel, Some(Season::Summer));
        assert_eq!(b.quality, 80.0);
        assert_eq!(b.usage, 2.5);
        assert_eq!(b.learned, 0.5);
        assert_eq!(b.theme, 5.0);
        assert_eq!(b.season, 2.0);
        assert_eq!(b.format, 5.0);
        assert_eq!(b.total(), 95.0);

        // Wildcard-only season and a feed slot earn nothing for those terms.
        let mut wildcard = asset();
        wildcard.seasons = [Season::AllSeasons].into_iter().collect();
        let b = scorer.score(&wildcard, &slot(None, Some(PostFormat::Feed)), Some(Season::Summer));
        assert_eq!(b.season, 0.0);
        assert_eq!(b.format, 0.0);
        assert_eq!(b.theme, 0.0);
    }
}
