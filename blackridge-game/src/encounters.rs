//! Encounter resolution and location availability.
use crate::data::{Catalog, Encounter, EncounterEntry, EncounterSlot, Location};
use crate::state::{Ledger, TimeOfDay};

/// How [`resolve_with_source`] found its encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedFrom {
    /// Registered for this exact location and time of day.
    ExactTime,
    /// Registered for this location under the `ANY` slot.
    AnyTime,
    /// First entry authored for the location, whatever its slot.
    FirstAuthored,
    /// Nothing authored; built from the location's own text.
    Synthesized,
}

type Lookup = fn(&[&EncounterEntry], TimeOfDay) -> Option<usize>;

/// Ordered fallback lookups; the first hit wins.
const RESOLUTION_ORDER: [(ResolvedFrom, Lookup); 3] = [
    (ResolvedFrom::ExactTime, exact_time),
    (ResolvedFrom::AnyTime, any_time),
    (ResolvedFrom::FirstAuthored, first_authored),
];

fn exact_time(entries: &[&EncounterEntry], time: TimeOfDay) -> Option<usize> {
    entries
        .iter()
        .position(|entry| entry.slot == EncounterSlot::At(time))
}

fn any_time(entries: &[&EncounterEntry], _time: TimeOfDay) -> Option<usize> {
    entries
        .iter()
        .position(|entry| entry.slot == EncounterSlot::Any)
}

fn first_authored(entries: &[&EncounterEntry], _time: TimeOfDay) -> Option<usize> {
    (!entries.is_empty()).then_some(0)
}

const UNNAMED_PLACE: &str = "Nowhere";

/// Select the encounter for a location and time. Never fails.
#[must_use]
pub fn resolve(location_id: &str, time: TimeOfDay, catalog: &Catalog) -> Encounter {
    resolve_with_source(location_id, time, catalog).0
}

/// [`resolve`] plus which fallback step produced the result.
#[must_use]
pub fn resolve_with_source(
    location_id: &str,
    time: TimeOfDay,
    catalog: &Catalog,
) -> (Encounter, ResolvedFrom) {
    let entries: Vec<&EncounterEntry> = catalog
        .encounters
        .iter()
        .filter(|entry| entry.location == location_id)
        .collect();

    for (source, lookup) in RESOLUTION_ORDER {
        if let Some(idx) = lookup(&entries, time) {
            return (entries[idx].encounter.clone(), source);
        }
    }

    let synthesized = catalog.location(location_id).map_or_else(
        || Encounter::synthesized(place_title(location_id), "Nothing here answers you."),
        |loc| Encounter::synthesized(place_title(&loc.name), &loc.description),
    );
    (synthesized, ResolvedFrom::Synthesized)
}

/// Title for a synthesized encounter; blank names fall back to a fixed one.
fn place_title(name: &str) -> &str {
    if name.trim().is_empty() {
        UNNAMED_PLACE
    } else {
        name
    }
}

/// Whether the player may travel to `location` from the current ledger.
#[must_use]
pub fn is_location_available(location: &Location, ledger: &Ledger) -> bool {
    if location.area != ledger.area {
        return false;
    }
    if ledger.is_trapped {
        return location.id == ledger.location;
    }
    !location.is_trap
}

/// Locations selectable right now, in catalog order.
#[must_use]
pub fn available_locations<'a>(ledger: &Ledger, catalog: &'a Catalog) -> Vec<&'a Location> {
    catalog
        .locations
        .iter()
        .filter(|loc| is_location_available(loc, ledger))
        .collect()
}
