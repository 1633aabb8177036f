//! Run state: the ledger aggregate and its clock, area and flag types.
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::data::EventId;
use crate::stats::Stats;

/// Six ordered slots that make up one day.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeOfDay {
    #[default]
    Morning,
    Forenoon,
    Afternoon,
    Dusk,
    Night,
    Midnight,
}

impl TimeOfDay {
    pub const ALL: [Self; 6] = [
        Self::Morning,
        Self::Forenoon,
        Self::Afternoon,
        Self::Dusk,
        Self::Night,
        Self::Midnight,
    ];

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Morning => 0,
            Self::Forenoon => 1,
            Self::Afternoon => 2,
            Self::Dusk => 3,
            Self::Night => 4,
            Self::Midnight => 5,
        }
    }

    /// Next slot in the cycle, and whether the cycle wrapped back to the first slot.
    #[must_use]
    pub const fn next(self) -> (Self, bool) {
        let next = Self::ALL[(self.index() + 1) % Self::ALL.len()];
        (next, next.index() == 0)
    }

    #[must_use]
    pub const fn is_daytime(self) -> bool {
        matches!(self, Self::Morning | Self::Forenoon | Self::Afternoon)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Morning => "MORNING",
            Self::Forenoon => "FORENOON",
            Self::Afternoon => "AFTERNOON",
            Self::Dusk => "DUSK",
            Self::Night => "NIGHT",
            Self::Midnight => "MIDNIGHT",
        }
    }

    #[must_use]
    pub const fn clock_label(self) -> &'static str {
        match self {
            Self::Morning => "06:00",
            Self::Forenoon => "08:00",
            Self::Afternoon => "13:00",
            Self::Dusk => "17:00",
            Self::Night => "20:00",
            Self::Midnight => "02:00",
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown time of day: {0}")]
pub struct UnknownTimeOfDay(pub String);

impl FromStr for TimeOfDay {
    type Err = UnknownTimeOfDay;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|slot| slot.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownTimeOfDay(s.to_string()))
    }
}

/// The two top-level zones, each with its own location set.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Area {
    #[default]
    MiningTown,
    ProvincialCapital,
}

impl Area {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MiningTown => "MINING_TOWN",
            Self::ProvincialCapital => "PROVINCIAL_CAPITAL",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::MiningTown => "Blackridge Mining District",
            Self::ProvincialCapital => "The Provincial Capital",
        }
    }

    /// Where a traveller lands after moving into this area.
    #[must_use]
    pub const fn arrival_location(self) -> &'static str {
        match self {
            Self::MiningTown => "HOME",
            Self::ProvincialCapital => "SQUARE",
        }
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side-state outside the numeric stat set.
///
/// Flags change only through the event or special action that owns them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StatusFlags {
    #[serde(default)]
    pub flu_days: u32,
    #[serde(default)]
    pub is_crackdown: bool,
    #[serde(default)]
    pub chen_yi_relation: f64,
    #[serde(default)]
    pub has_cheat_package: bool,
    #[serde(default)]
    pub is_mother_dead: bool,
}

/// Insertion-ordered log that keeps only the most recent entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct History(VecDeque<String>);

impl History {
    #[must_use]
    pub fn seeded(opening: impl Into<String>) -> Self {
        Self(VecDeque::from([opening.into()]))
    }

    /// Append an entry, dropping the oldest ones beyond `limit`.
    pub fn push(&mut self, entry: impl Into<String>, limit: usize) {
        self.0.push_back(entry.into());
        while self.0.len() > limit.max(1) {
            self.0.pop_front();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.0.back().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.iter().map(String::as_str)
    }
}

pub const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Complete state of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    pub seed: u64,
    pub day: u32,
    pub time: TimeOfDay,
    pub area: Area,
    pub location: String,
    pub stats: Stats,
    pub flags: StatusFlags,
    pub history: History,
    #[serde(default)]
    pub visited: BTreeSet<String>,
    #[serde(default)]
    pub is_trapped: bool,
    #[serde(default)]
    pub pending_event: Option<EventId>,
    #[serde(default)]
    pub resolved_events: BTreeSet<EventId>,
    #[serde(default)]
    pub read_messages: BTreeSet<String>,
}

impl Ledger {
    /// Fresh day-one ledger at `location` in `area`.
    #[must_use]
    pub fn starting_at(
        seed: u64,
        area: Area,
        location: impl Into<String>,
        stats: Stats,
        flags: StatusFlags,
        history: History,
    ) -> Self {
        let location = location.into();
        Self {
            seed,
            day: 1,
            time: TimeOfDay::Morning,
            area,
            visited: BTreeSet::from([location.clone()]),
            location,
            stats,
            flags,
            history,
            is_trapped: false,
            pending_event: None,
            resolved_events: BTreeSet::new(),
            read_messages: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_stats(&self, stats: Stats) -> Self {
        Self {
            stats,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn weekday(&self) -> &'static str {
        let idx = usize::try_from(self.day.saturating_sub(1)).unwrap_or(0) % WEEKDAYS.len();
        WEEKDAYS[idx]
    }

    #[must_use]
    pub fn last_history(&self) -> Option<&str> {
        self.history.last()
    }

    #[must_use]
    pub fn has_resolved(&self, event: EventId) -> bool {
        self.resolved_events.contains(&event)
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::starting_at(
            0,
            Area::MiningTown,
            Area::MiningTown.arrival_location(),
            Stats::default(),
            StatusFlags::default(),
            History::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn six_steps_wrap_exactly_once() {
        let mut slot = TimeOfDay::Morning;
        let mut wraps = 0;
        for _ in 0..6 {
            let (next, wrapped) = slot.next();
            if wrapped {
                wraps += 1;
            }
            slot = next;
        }
        assert_eq!(slot, TimeOfDay::Morning);
        assert_eq!(wraps, 1);
        assert_eq!(TimeOfDay::Midnight.next(), (TimeOfDay::Morning, true));
        assert_eq!(TimeOfDay::Afternoon.next(), (TimeOfDay::Dusk, false));
    }

    #[test]
    fn daytime_covers_first_three_slots() {
        let daytime: Vec<_> = TimeOfDay::ALL
            .into_iter()
            .filter(|slot| slot.is_daytime())
            .collect();
        assert_eq!(
            daytime,
            vec![TimeOfDay::Morning, TimeOfDay::Forenoon, TimeOfDay::Afternoon]
        );
    }

    #[test]
    fn history_keeps_most_recent_entries_in_order() {
        let mut history = History::seeded("opening");
        for idx in 0..40 {
            history.push(format!("entry {idx}"), 30);
        }
        assert_eq!(history.len(), 30);
        let entries: Vec<_> = history.iter().collect();
        assert_eq!(entries.first(), Some(&"entry 10"));
        assert_eq!(history.last(), Some("entry 39"));
    }

    #[test]
    fn weekday_cycles_from_monday() {
        let mut ledger = Ledger::default();
        assert_eq!(ledger.weekday(), "Mon");
        ledger.day = 8;
        assert_eq!(ledger.weekday(), "Mon");
        ledger.day = 14;
        assert_eq!(ledger.weekday(), "Sun");
    }

    #[test]
    fn time_of_day_round_trips_through_str() {
        for slot in TimeOfDay::ALL {
            assert_eq!(slot.as_str().parse::<TimeOfDay>(), Ok(slot));
        }
        assert!("NOON".parse::<TimeOfDay>().is_err());
    }
}
