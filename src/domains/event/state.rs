//! Persisted conference state.
//!
//! Venue names are case-insensitive identities: lookups go through
//! [`venue_key`], while the maps store and display the casing the venue was
//! created with.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::engine::{Result, validation};

/// Normalised lookup key for a venue name.
pub fn venue_key(name: &str) -> String {
    name.to_lowercase()
}

/// A bookable room.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Venue {
    /// Seats available
    #[serde(default)]
    pub capacity: u64,
    /// Whether the room has an A/V system
    #[serde(default)]
    pub has_av_system: bool,
}

/// A scheduled session occupying one venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Session title
    pub name: String,
    /// Speaker, if given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosted_by: Option<String>,
    /// Stored name of the venue the session is booked into
    pub in_venue: String,
    /// Expected head count, if given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_attendees: Option<u64>,
    /// Whether the session needs A/V, if given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_av: Option<bool>,
}

impl Session {
    /// Whether this session would fit into `venue`.
    pub fn fits(&self, venue: &Venue) -> bool {
        self.expected_attendees.unwrap_or(0) <= venue.capacity
            && (!self.requires_av.unwrap_or(false) || venue.has_av_system)
    }
}

/// Venues, sessions and the bookings linking them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConferenceState {
    /// Venues by stored name
    #[serde(default)]
    pub venues: BTreeMap<String, Venue>,
    /// Sessions in scheduling order
    #[serde(default)]
    pub sessions: Vec<Session>,
    /// Stored venue name to the session occupying it
    #[serde(default)]
    pub venue_bookings: BTreeMap<String, String>,
}

impl ConferenceState {
    /// The canonical empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether nothing has been created yet.
    pub fn is_empty(&self) -> bool {
        self.venues.is_empty() && self.sessions.is_empty() && self.venue_bookings.is_empty()
    }

    /// Map from [`venue_key`] to stored venue name.
    pub fn venue_index(&self) -> HashMap<String, String> {
        self.venues
            .keys()
            .map(|name| (venue_key(name), name.clone()))
            .collect()
    }

    /// Find a venue by name, ignoring case. Returns the stored name.
    pub fn find_venue(&self, name: &str) -> Option<(&str, &Venue)> {
        let key = venue_key(name);
        self.venues
            .iter()
            .find(|(stored, _)| venue_key(stored) == key)
            .map(|(stored, venue)| (stored.as_str(), venue))
    }

    /// Session currently booked into the venue with this stored name.
    pub fn booking_for(&self, venue: &str) -> Option<&str> {
        self.venue_bookings.get(venue).map(String::as_str)
    }

    /// Every broken invariant, as a human-readable line.
    pub fn violations(&self) -> Vec<String> {
        let mut problems = Vec::new();

        let mut seen = HashMap::new();
        for name in self.venues.keys() {
            if let Some(previous) = seen.insert(venue_key(name), name) {
                problems.push(format!("venues '{}' and '{}' differ only in case", previous, name));
            }
        }

        for session in &self.sessions {
            match self.venues.get(&session.in_venue) {
                None => problems.push(format!(
                    "session '{}' references unknown venue '{}'",
                    session.name, session.in_venue
                )),
                Some(venue) if !session.fits(venue) => problems.push(format!(
                    "session '{}' does not fit venue '{}'",
                    session.name, session.in_venue
                )),
                Some(_) => {}
            }
            if self.booking_for(&session.in_venue) != Some(session.name.as_str()) {
                problems.push(format!(
                    "session '{}' has no booking for venue '{}'",
                    session.name, session.in_venue
                ));
            }
        }

        for (venue, session) in &self.venue_bookings {
            if !self.venues.contains_key(venue) {
                problems.push(format!("booking for unknown venue '{}'", venue));
            }
            if !self
                .sessions
                .iter()
                .any(|s| &s.in_venue == venue && &s.name == session)
            {
                problems.push(format!(
                    "venue '{}' is booked by '{}' but no such session is scheduled there",
                    venue, session
                ));
            }
        }

        if self.sessions.len() != self.venue_bookings.len() {
            problems.push(format!(
                "{} sessions but {} bookings",
                self.sessions.len(),
                self.venue_bookings.len()
            ));
        }

        problems
    }

    /// Fail with a validation error listing every broken invariant.
    pub fn verify(&self) -> Result<()> {
        let problems = self.violations();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(validation(format!("inconsistent conference state: {}", problems.join("; "))))
        }
    }
}
