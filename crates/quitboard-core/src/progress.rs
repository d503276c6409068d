//! Pure progress arithmetic.
//!
//! Maps (cutoff date, unit price, today) to elapsed days and cumulative
//! savings. No I/O, no clock access -- the caller supplies `today`, which
//! keeps every function here deterministic and trivially testable.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Derived day/savings pair for one member.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub days: u32,
    pub saved: f64,
}

/// Compute elapsed days and cumulative savings.
///
/// - No cutoff date: the unregistered baseline `(0, 0.0)`.
/// - Cutoff in the future clamps to 0 days rather than erroring;
///   validation happens earlier, at capture time.
/// - No unit price: savings stay 0 regardless of elapsed days.
/// - Model: exactly one unit avoided per elapsed day. No rounding here;
///   presentation rounds.
pub fn compute_progress(
    cutoff: Option<NaiveDate>,
    unit_price: Option<f64>,
    today: NaiveDate,
) -> Progress {
    let Some(cutoff) = cutoff else {
        return Progress { days: 0, saved: 0.0 };
    };
    let days = (today - cutoff).num_days().max(0) as u32;
    let saved = match unit_price {
        Some(price) => f64::from(days) * price,
        None => 0.0,
    };
    Progress { days, saved }
}

/// Maximum length of the tenure badge surfaced through the transport.
pub const TENURE_TITLE_MAX: usize = 16;

/// Short tenure badge text, e.g. `12d`. Clamped to [`TENURE_TITLE_MAX`]
/// characters, floor of `0d` for non-positive tenures.
pub fn tenure_title(days: u32) -> String {
    let text = format!("{days}d");
    text.chars().take(TENURE_TITLE_MAX).collect()
}

/// Qualitative tenure tier shown to the member on commit and in stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankLabel {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl RankLabel {
    /// Tier boundaries in months of tenure, one month = 30 days.
    pub fn from_days(days: u32) -> Self {
        let months = f64::from(days) / 30.0;
        if months < 6.0 {
            RankLabel::Bronze
        } else if months < 12.0 {
            RankLabel::Silver
        } else if months < 24.0 {
            RankLabel::Gold
        } else {
            RankLabel::Platinum
        }
    }
}

impl std::fmt::Display for RankLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            RankLabel::Bronze => "Bronze",
            RankLabel::Silver => "Silver",
            RankLabel::Gold => "Gold",
            RankLabel::Platinum => "Platinum",
        };
        f.write_str(text)
    }
}
