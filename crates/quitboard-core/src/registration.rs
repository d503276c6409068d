//! Registration wizard state machine.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> AwaitingDate -> AwaitingPrice -> Committed
//! ```
//!
//! `Idle` is implicit (no entry in the map) and `Committed` is terminal
//! (entry cleared, authoritative member record written by the engine).
//! The map is process-lifetime only: a restart silently drops in-flight
//! wizards, which is a stated behavior, not an accident -- the member
//! simply starts over.
//!
//! Transitions for the same member are last-received-wins; a fresh
//! `start` supersedes a stale attempt from a crashed prior run.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{Days, Duration, NaiveDate};

use crate::error::{StateConflict, ValidationError};
use crate::storage::MemberId;

/// Free-text date formats accepted by the wizard.
pub const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d.%m.%Y"];

/// A date selection: canned offset buttons or free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateInput {
    Today,
    Yesterday,
    DaysAgo(u32),
    Text(String),
}

/// Where one member currently stands in the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    AwaitingDate,
    AwaitingPrice { cutoff: NaiveDate },
}

/// Process-wide transient wizard state, keyed by member id.
#[derive(Debug, Default)]
pub struct RegistrationWizard {
    states: Mutex<HashMap<MemberId, Stage>>,
}

impl RegistrationWizard {
    pub fn new() -> Self {
        Self::default()
    }

    fn states(&self) -> std::sync::MutexGuard<'_, HashMap<MemberId, Stage>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// `Idle -> AwaitingDate`. Clears any stale prior state for the
    /// member; last start wins.
    pub fn start(&self, member: MemberId) {
        self.states().insert(member, Stage::AwaitingDate);
    }

    /// Any state -> `Idle`.
    pub fn cancel(&self, member: MemberId) {
        self.states().remove(&member);
    }

    /// `AwaitingDate -> AwaitingPrice` on a valid selection.
    ///
    /// A date that fails to parse or lies strictly in the future rejects
    /// the transition; the machine stays in `AwaitingDate`.
    pub fn submit_date(
        &self,
        member: MemberId,
        input: &DateInput,
        today: NaiveDate,
    ) -> Result<NaiveDate, crate::error::EngineError> {
        let mut states = self.states();
        match states.get(&member) {
            None => Err(StateConflict::NoWizard(member).into()),
            Some(_) => {
                let cutoff = resolve_date(input, today)?;
                states.insert(member, Stage::AwaitingPrice { cutoff });
                Ok(cutoff)
            }
        }
    }

    /// Candidate cutoff date held for the price step, if any.
    ///
    /// Deliberately non-consuming: the engine clears the entry with
    /// [`clear_committed`](Self::clear_committed) only after the
    /// persisted write succeeds, so a failed commit keeps the date for a
    /// retry without re-entering it.
    pub fn pending_cutoff(&self, member: MemberId) -> Option<NaiveDate> {
        match self.states().get(&member) {
            Some(Stage::AwaitingPrice { cutoff }) => Some(*cutoff),
            _ => None,
        }
    }

    /// True if the member has any wizard entry at all.
    pub fn in_progress(&self, member: MemberId) -> bool {
        self.states().contains_key(&member)
    }

    /// `AwaitingPrice -> Committed`: terminal, entry removed.
    pub fn clear_committed(&self, member: MemberId) {
        self.states().remove(&member);
    }
}

/// Resolve a date selection against `today`.
///
/// Offsets large enough to fall off the calendar are validation
/// failures, not overflows.
pub fn resolve_date(input: &DateInput, today: NaiveDate) -> Result<NaiveDate, ValidationError> {
    let date = match input {
        DateInput::Today => today,
        DateInput::Yesterday => today - Duration::days(1),
        DateInput::DaysAgo(n) => today
            .checked_sub_days(Days::new(u64::from(*n)))
            .ok_or_else(|| ValidationError::BadDate {
                input: format!("{n} days ago"),
            })?,
        DateInput::Text(text) => parse_date_text(text)?,
    };
    if date > today {
        return Err(ValidationError::FutureDate { date });
    }
    Ok(date)
}

fn parse_date_text(text: &str) -> Result<NaiveDate, ValidationError> {
    let trimmed = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| ValidationError::BadDate {
            input: trimmed.to_string(),
        })
}

/// Parse a price entry: canned choice or free text, comma or dot
/// decimal separator, non-negative.
pub fn parse_price(text: &str) -> Result<f64, ValidationError> {
    let normalized = text.trim().replace(',', ".");
    let value: f64 = normalized.parse().map_err(|_| ValidationError::BadPrice {
        input: text.trim().to_string(),
    })?;
    if !value.is_finite() {
        return Err(ValidationError::BadPrice {
            input: text.trim().to_string(),
        });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativePrice { value });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn today() -> NaiveDate {
        d(2024, 6, 15)
    }

    #[test]
    fn canned_offsets_resolve() {
        assert_eq!(resolve_date(&DateInput::Today, today()).unwrap(), d(2024, 6, 15));
        assert_eq!(resolve_date(&DateInput::Yesterday, today()).unwrap(), d(2024, 6, 14));
        assert_eq!(resolve_date(&DateInput::DaysAgo(7), today()).unwrap(), d(2024, 6, 8));
    }

    #[test]
    fn both_text_formats_parse() {
        let iso = DateInput::Text("2024-06-01".into());
        let dotted = DateInput::Text("01.06.2024".into());
        assert_eq!(resolve_date(&iso, today()).unwrap(), d(2024, 6, 1));
        assert_eq!(resolve_date(&dotted, today()).unwrap(), d(2024, 6, 1));
    }

    #[test]
    fn off_calendar_day_offset_rejects() {
        // Anything the CLI can parse as a u32 must come back as a
        // validation failure, even offsets past the calendar's floor.
        let err = resolve_date(&DateInput::DaysAgo(4_000_000_000), today()).unwrap_err();
        assert!(matches!(err, ValidationError::BadDate { .. }));
    }

    #[test]
    fn garbage_and_future_dates_reject() {
        let bad = resolve_date(&DateInput::Text("junk".into()), today());
        assert!(matches!(bad, Err(ValidationError::BadDate { .. })));

        let future = resolve_date(&DateInput::Text("2030-01-01".into()), today());
        assert!(matches!(future, Err(ValidationError::FutureDate { .. })));
    }

    #[test]
    fn price_accepts_comma_and_dot() {
        assert_eq!(parse_price("250").unwrap(), 250.0);
        assert_eq!(parse_price("249.5").unwrap(), 249.5);
        assert_eq!(parse_price("249,5").unwrap(), 249.5);
        assert_eq!(parse_price("0").unwrap(), 0.0);
    }

    #[test]
    fn price_rejects_garbage_and_negatives() {
        assert!(matches!(parse_price("abc"), Err(ValidationError::BadPrice { .. })));
        assert!(matches!(parse_price("-5"), Err(ValidationError::NegativePrice { .. })));
        assert!(matches!(parse_price("inf"), Err(ValidationError::BadPrice { .. })));
    }

    #[test]
    fn full_happy_path() {
        let wizard = RegistrationWizard::new();
        let member = MemberId(1);

        wizard.start(member);
        let cutoff = wizard
            .submit_date(member, &DateInput::DaysAgo(10), today())
            .unwrap();
        assert_eq!(cutoff, d(2024, 6, 5));
        assert_eq!(wizard.pending_cutoff(member), Some(cutoff));

        wizard.clear_committed(member);
        assert!(!wizard.in_progress(member));
    }

    #[test]
    fn date_without_start_is_a_state_conflict() {
        let wizard = RegistrationWizard::new();
        let err = wizard
            .submit_date(MemberId(1), &DateInput::Today, today())
            .unwrap_err();
        assert!(matches!(err, EngineError::StateConflict(StateConflict::NoWizard(_))));
    }

    #[test]
    fn rejected_date_keeps_awaiting_date() {
        let wizard = RegistrationWizard::new();
        let member = MemberId(1);
        wizard.start(member);

        let err = wizard
            .submit_date(member, &DateInput::Text("2099-01-01".into()), today())
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        // Still awaiting a date, not a price.
        assert!(wizard.in_progress(member));
        assert_eq!(wizard.pending_cutoff(member), None);
    }

    #[test]
    fn fresh_start_supersedes_in_flight_attempt() {
        let wizard = RegistrationWizard::new();
        let member = MemberId(1);
        wizard.start(member);
        wizard
            .submit_date(member, &DateInput::Today, today())
            .unwrap();
        assert!(wizard.pending_cutoff(member).is_some());

        // Last start wins: back to awaiting a date.
        wizard.start(member);
        assert_eq!(wizard.pending_cutoff(member), None);
        assert!(wizard.in_progress(member));
    }

    #[test]
    fn cancel_returns_to_idle() {
        let wizard = RegistrationWizard::new();
        let member = MemberId(1);
        wizard.start(member);
        wizard.cancel(member);
        assert!(!wizard.in_progress(member));
    }
}
