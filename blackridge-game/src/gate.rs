//! Choice availability checks. Never mutates state.
use crate::data::Choice;
use crate::stats::{Stats, UnmetRequirement};

/// True iff the choice has no requirements or every threshold is met.
#[must_use]
pub fn is_available(choice: &Choice, stats: &Stats) -> bool {
    choice.requires.is_met(stats)
}

/// Thresholds blocking a choice, for presentation.
#[must_use]
pub fn unmet_requirements(choice: &Choice, stats: &Stats) -> Vec<UnmetRequirement> {
    choice.requires.unmet(stats)
}
