//! Editorial rule set: weekday cadence rules, seasonal theme windows and the
//! month-to-season calendar, evaluated for one explicit date at a time.

pub mod cadence;
pub mod ruleset;
pub mod seasons;
pub mod themes;

pub use cadence::{CadenceRule, Frequency};
pub use ruleset::RuleSet;
pub use seasons::SeasonCalendar;
pub use themes::SeasonalTheme;
