//! Static content catalog: locations, encounters, events and phone listings.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

use crate::state::{Area, StatusFlags, TimeOfDay};
use crate::stats::{Requirements, StatDelta, Stats};

const DEFAULT_CATALOG_DATA: &str = include_str!("../assets/data/catalog.json");

/// Story events that can pre-empt a location encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventId {
    FluOutbreak,
    Crackdown,
    ChenYiSuspicion,
    MotherCrisis,
}

impl EventId {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FluOutbreak => "FLU_OUTBREAK",
            Self::Crackdown => "CRACKDOWN",
            Self::ChenYiSuspicion => "CHEN_YI_SUSPICION",
            Self::MotherCrisis => "MOTHER_CRISIS",
        }
    }

    /// One-shot events never fire again once resolved.
    #[must_use]
    pub const fn is_one_shot(self) -> bool {
        matches!(self, Self::ChenYiSuspicion | Self::MotherCrisis)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Narrative hooks a choice can trigger beyond its stat delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpecialAction {
    ChenExplain,
    ChenBreakup,
    MotherSave,
    MotherAbandon,
    CheatPackage,
    Trapped,
    Escape,
}

/// Character voicing an encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Speaker {
    Player,
    Teacher,
    Mother,
    Thug,
    OldMiner,
    Boss,
    Boyfriend,
    DaoGe,
    ChenYi,
    HongJie,
    OldGui,
}

/// A selectable action within an encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub text: String,
    #[serde(default)]
    pub impact: String,
    #[serde(default)]
    pub deltas: StatDelta,
    #[serde(default)]
    pub requires: Requirements,
    #[serde(default)]
    pub new_area: Option<Area>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub special: Option<SpecialAction>,
    /// Leave the encounter without spending a turn.
    #[serde(default)]
    pub is_return: bool,
}

/// A narrative unit offered at a location or by an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encounter {
    pub title: String,
    pub description: String,
    #[serde(default = "Encounter::default_terminal")]
    pub is_final: bool,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub speaker: Option<Speaker>,
}

impl Encounter {
    const fn default_terminal() -> bool {
        true
    }

    /// Terminal, choiceless stand-in built from a location's own text.
    #[must_use]
    pub fn synthesized(title: &str, description: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            is_final: true,
            choices: Vec::new(),
            speaker: None,
        }
    }
}

/// Time key an encounter is registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EncounterSlot {
    Any,
    At(TimeOfDay),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown encounter slot: {0}")]
pub struct UnknownSlot(pub String);

impl FromStr for EncounterSlot {
    type Err = UnknownSlot;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("ANY") {
            return Ok(Self::Any);
        }
        s.parse::<TimeOfDay>()
            .map(Self::At)
            .map_err(|_| UnknownSlot(s.to_string()))
    }
}

impl TryFrom<String> for EncounterSlot {
    type Error = UnknownSlot;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EncounterSlot> for String {
    fn from(slot: EncounterSlot) -> Self {
        match slot {
            EncounterSlot::Any => "ANY".to_string(),
            EncounterSlot::At(time) => time.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterEntry {
    pub location: String,
    pub slot: EncounterSlot,
    pub encounter: Encounter,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub name: String,
    pub description: String,
    pub area: Area,
    /// Reachable only while the player is held there.
    #[serde(default)]
    pub is_trap: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEntry {
    pub id: EventId,
    pub encounter: Encounter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub impact: StatDelta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrayTask {
    pub id: String,
    pub name: String,
    pub reward: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub risk: String,
    #[serde(default)]
    pub impact: StatDelta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub distance: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub impact: StatDelta,
    #[serde(default)]
    pub requires: Requirements,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboxMessage {
    pub id: String,
    pub sender: String,
    pub content: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub impact: StatDelta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrologueOption {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub outcome: String,
    #[serde(default)]
    pub impact: StatDelta,
}

/// Fixed starting point every run is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Baseline {
    pub stats: Stats,
    #[serde(default)]
    pub flags: StatusFlags,
    #[serde(default)]
    pub area: Area,
    pub location: String,
    #[serde(default)]
    pub opening: String,
}

/// Container for all static game content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Catalog {
    pub baseline: Baseline,
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub encounters: Vec<EncounterEntry>,
    #[serde(default)]
    pub events: Vec<EventEntry>,
    pub faint: Option<Encounter>,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub gray_tasks: Vec<GrayTask>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub messages: Vec<InboxMessage>,
    #[serde(default)]
    pub prologue: Vec<PrologueOption>,
}

impl Catalog {
    /// Load catalog data from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into a valid catalog.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Parse the bundled content asset.
    #[must_use]
    pub fn load_from_static() -> Self {
        Self::from_json(DEFAULT_CATALOG_DATA).unwrap_or_else(|err| {
            log::error!("bundled catalog failed to parse: {err}");
            Self::default()
        })
    }

    #[must_use]
    pub fn location(&self, id: &str) -> Option<&Location> {
        self.locations.iter().find(|loc| loc.id == id)
    }

    /// Display name for a location id, falling back to the id itself.
    #[must_use]
    pub fn location_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.location(id).map_or(id, |loc| loc.name.as_str())
    }

    #[must_use]
    pub fn event(&self, id: EventId) -> Option<&Encounter> {
        self.events
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| &entry.encounter)
    }

    #[must_use]
    pub fn product(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|item| item.id == id)
    }

    #[must_use]
    pub fn gray_task(&self, id: &str) -> Option<&GrayTask> {
        self.gray_tasks.iter().find(|task| task.id == id)
    }

    #[must_use]
    pub fn contact(&self, id: &str) -> Option<&Contact> {
        self.contacts.iter().find(|contact| contact.id == id)
    }

    #[must_use]
    pub fn message(&self, id: &str) -> Option<&InboxMessage> {
        self.messages.iter().find(|message| message.id == id)
    }

    #[must_use]
    pub fn prologue_option(&self, id: &str) -> Option<&PrologueOption> {
        self.prologue.iter().find(|option| option.id == id)
    }

    /// Encounter shown when the player collapses from exhaustion.
    #[must_use]
    pub fn faint_encounter(&self) -> Encounter {
        self.faint.clone().unwrap_or_else(|| Encounter {
            title: "Blackout".to_string(),
            description: "The world tilts and every sound drains away.".to_string(),
            is_final: true,
            choices: Vec::new(),
            speaker: None,
        })
    }
}

/// Process-wide bundled catalog.
#[must_use]
pub fn catalog() -> &'static Catalog {
    static CATALOG: OnceLock<Catalog> = OnceLock::new();
    CATALOG.get_or_init(Catalog::load_from_static)
}
