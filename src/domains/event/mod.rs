//! Conference planning interpreter.
//!
//! A program is a single `role "<role>" { ... }` block of venue and session
//! commands. Commands run in order against a private draft of the caller's
//! [`ConferenceState`]; the draft is only handed back, as
//! [`EventOutcome::new_state`], once every command has succeeded. On any
//! failure the draft is thrown away and the caller's state is untouched.

/// Persisted venues, sessions and bookings.
pub mod state;

pub use state::{ConferenceState, Session, Venue, venue_key};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::engine::{EngineError, Interpreter, Node, Result, unexpected, validation};

/// Roles that may run conference commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// May manage venues and sessions.
    Admin,
    /// May manage sessions only.
    Scheduler,
}

impl Role {
    /// Parse a role name, ignoring case. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Role> {
        match name.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "scheduler" => Some(Role::Scheduler),
            _ => None,
        }
    }

    /// Lowercase role name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Scheduler => "scheduler",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const VENUE_MANAGERS: &[Role] = &[Role::Admin];
const SESSION_MANAGERS: &[Role] = &[Role::Admin, Role::Scheduler];

/// A venue property as written in the DSL.
#[derive(Debug, Clone, PartialEq)]
pub enum VenueProperty {
    /// `capacity: N`
    Capacity(u64),
    /// `has_av_system: true|false`
    HasAvSystem(bool),
}

/// A session property as written in the DSL.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionProperty {
    /// `hosted_by: "<speaker>"`
    HostedBy(String),
    /// `in_venue: "<venue>"`
    InVenue(String),
    /// `expected_attendees: N`
    ExpectedAttendees(u64),
    /// `requires_av: true|false`
    RequiresAv(bool),
}

/// One command inside a role block.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `create_venue "<name>" { ... }`
    CreateVenue {
        /// Venue name
        name: String,
        /// Properties in source order
        properties: Vec<VenueProperty>,
    },
    /// `modify_venue "<name>" { ... }`
    ModifyVenue {
        /// Venue name
        name: String,
        /// Properties to merge
        properties: Vec<VenueProperty>,
    },
    /// `schedule_session "<name>" { ... }`
    ScheduleSession {
        /// Session name
        name: String,
        /// Properties in source order
        properties: Vec<SessionProperty>,
    },
    /// `cancel_session "<name>"`
    CancelSession {
        /// Session name
        name: String,
    },
}

impl Command {
    fn from_node(node: Node) -> Result<Self> {
        let (rule, children) = match node {
            Node::Branch { rule, children } => (rule, children),
            other => return Err(unexpected("command", other.describe())),
        };
        let mut children = children.into_iter();
        let name = children
            .next()
            .ok_or_else(|| unexpected(format!("{} name", rule), "nothing"))?
            .into_text()?;

        match rule.as_str() {
            "create_venue" => Ok(Command::CreateVenue {
                name,
                properties: children.map(venue_property).collect::<Result<_>>()?,
            }),
            "modify_venue" => Ok(Command::ModifyVenue {
                name,
                properties: children.map(venue_property).collect::<Result<_>>()?,
            }),
            "schedule_session" => Ok(Command::ScheduleSession {
                name,
                properties: children.map(session_property).collect::<Result<_>>()?,
            }),
            "cancel_session" => Ok(Command::CancelSession { name }),
            other => Err(unexpected("command", other)),
        }
    }
}

fn single_child(node: Node) -> Result<(String, Node)> {
    match node {
        Node::Branch { rule, children } if children.len() == 1 => {
            let child = children.into_iter().next().ok_or_else(|| unexpected("property value", "nothing"))?;
            Ok((rule, child))
        }
        other => Err(unexpected("property", other.describe())),
    }
}

fn venue_property(node: Node) -> Result<VenueProperty> {
    let (rule, value) = single_child(node)?;
    match rule.as_str() {
        "venue_capacity" => Ok(VenueProperty::Capacity(whole_number("capacity", value.into_number()?)?)),
        "venue_av" => Ok(VenueProperty::HasAvSystem(parse_boolean(&value.into_text()?))),
        other => Err(unexpected("venue property", other)),
    }
}

fn session_property(node: Node) -> Result<SessionProperty> {
    let (rule, value) = single_child(node)?;
    match rule.as_str() {
        "session_speaker" => Ok(SessionProperty::HostedBy(value.into_text()?)),
        "session_venue" => Ok(SessionProperty::InVenue(value.into_text()?)),
        "session_attendees" => Ok(SessionProperty::ExpectedAttendees(whole_number(
            "expected_attendees",
            value.into_number()?,
        )?)),
        "session_requires_av" => Ok(SessionProperty::RequiresAv(parse_boolean(&value.into_text()?))),
        other => Err(unexpected("session property", other)),
    }
}

fn parse_boolean(text: &str) -> bool {
    text.eq_ignore_ascii_case("true")
}

fn whole_number(field: &str, value: f64) -> Result<u64> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u64::MAX as f64 {
        Ok(value as u64)
    } else {
        Err(validation(format!("{} must be a non-negative whole number, got {}.", field, value)))
    }
}

/// Result of a successful conference program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventOutcome {
    /// `"Execution successful. "` followed by the actions performed
    pub message: String,
    /// State after every command was applied; the caller persists this
    pub new_state: ConferenceState,
}

/// Conference interpreter for one request.
///
/// Holds a private copy of the caller's state; every run starts from that
/// copy, so nothing a run does is visible outside until it returns
/// successfully.
#[derive(Debug)]
pub struct EventInterpreter {
    base: ConferenceState,
    requested_role: Option<String>,
    draft: ConferenceState,
    venue_keys: HashMap<String, String>,
    role: String,
    actions: Vec<String>,
}

impl EventInterpreter {
    /// Create an interpreter over a copy of `state`.
    ///
    /// With `Some(role)`, the program's declared role must match it. With
    /// `None`, the declared role is trusted as-is.
    pub fn new(state: &ConferenceState, role: Option<&str>) -> Self {
        let base = state.clone();
        Self {
            venue_keys: base.venue_index(),
            draft: base.clone(),
            base,
            requested_role: role.map(str::to_string),
            role: role.unwrap_or_default().to_string(),
            actions: Vec::new(),
        }
    }

    /// Role the current run operates under.
    pub fn role(&self) -> &str {
        &self.role
    }

    /// The working copy. Only meaningful during or after a successful run.
    pub fn draft(&self) -> &ConferenceState {
        &self.draft
    }

    fn reset(&mut self) {
        self.draft = self.base.clone();
        self.venue_keys = self.draft.venue_index();
        self.role = self.requested_role.clone().unwrap_or_default();
        self.actions.clear();
    }

    fn require_role(&self, allowed: &[Role], operation: impl Into<String>) -> Result<()> {
        match Role::parse(&self.role) {
            Some(role) if allowed.contains(&role) => Ok(()),
            _ => Err(EngineError::RoleMismatch {
                role: self.role.clone(),
                operation: operation.into(),
                required: allowed
                    .iter()
                    .map(Role::as_str)
                    .collect::<Vec<_>>()
                    .join(" or "),
            }),
        }
    }

    fn stored_venue_name(&self, name: &str) -> Option<String> {
        self.venue_keys.get(&venue_key(name)).cloned()
    }

    /// Enter the role block declared by the program.
    pub fn enter_role(&mut self, declared: &str) -> Result<()> {
        match &self.requested_role {
            Some(requested) if !requested.trim().eq_ignore_ascii_case(declared.trim()) => {
                Err(EngineError::RoleMismatch {
                    role: requested.clone(),
                    operation: format!("run a block declared for role '{}'", declared),
                    required: declared.to_string(),
                })
            }
            Some(_) => Ok(()),
            None => {
                self.role = declared.to_string();
                Ok(())
            }
        }
    }

    /// Add a venue. Admin only.
    pub fn create_venue(&mut self, name: &str, properties: &[VenueProperty]) -> Result<()> {
        self.require_role(VENUE_MANAGERS, format!("create venue '{}'", name))?;
        if name.trim().is_empty() {
            return Err(validation("Venue name must not be empty."));
        }
        if let Some(existing) = self.stored_venue_name(name) {
            return Err(validation(format!("Venue '{}' already exists.", existing)));
        }

        let mut venue = Venue::default();
        apply_venue_properties(&mut venue, properties);

        tracing::debug!(venue = name, capacity = venue.capacity, av = venue.has_av_system, "creating venue");
        self.venue_keys.insert(venue_key(name), name.to_string());
        self.draft.venues.insert(name.to_string(), venue);
        self.actions.push(format!("Created venue '{}'", name));
        Ok(())
    }

    /// Merge properties into an existing venue. Admin only.
    ///
    /// A booked venue must still satisfy its session afterwards.
    pub fn modify_venue(&mut self, name: &str, properties: &[VenueProperty]) -> Result<()> {
        self.require_role(VENUE_MANAGERS, format!("modify venue '{}'", name))?;
        let stored = self
            .stored_venue_name(name)
            .ok_or_else(|| validation(format!("Venue '{}' does not exist.", name)))?;

        let mut venue = self.draft.venues.get(&stored).cloned().unwrap_or_default();
        apply_venue_properties(&mut venue, properties);

        if let Some(booked) = self.draft.booking_for(&stored) {
            let blocked = self
                .draft
                .sessions
                .iter()
                .find(|session| session.in_venue == stored && session.name == booked && !session.fits(&venue));
            if let Some(session) = blocked {
                return Err(validation(format!(
                    "Venue '{}' cannot be modified: booked session '{}' would no longer fit.",
                    stored, session.name
                )));
            }
        }

        tracing::debug!(venue = %stored, "modifying venue");
        self.draft.venues.insert(stored.clone(), venue);
        self.actions.push(format!("Modified venue '{}'", stored));
        Ok(())
    }

    /// Book a session into a venue. Admin or scheduler.
    pub fn schedule_session(&mut self, name: &str, properties: &[SessionProperty]) -> Result<()> {
        self.require_role(SESSION_MANAGERS, format!("schedule session '{}'", name))?;
        if name.trim().is_empty() {
            return Err(validation("Session name must not be empty."));
        }

        let mut hosted_by = None;
        let mut in_venue = None;
        let mut expected_attendees = None;
        let mut requires_av = None;
        for property in properties {
            match property {
                SessionProperty::HostedBy(speaker) => hosted_by = Some(speaker.clone()),
                SessionProperty::InVenue(venue) => in_venue = Some(venue.clone()),
                SessionProperty::ExpectedAttendees(count) => expected_attendees = Some(*count),
                SessionProperty::RequiresAv(flag) => requires_av = Some(*flag),
            }
        }

        let context = format!("Validation Error in session '{}'", name);
        let requested_venue =
            in_venue.ok_or_else(|| validation(format!("{}: no venue given.", context)))?;
        let stored = self
            .stored_venue_name(&requested_venue)
            .ok_or_else(|| validation(format!("{}: Venue '{}' does not exist.", context, requested_venue)))?;

        if let Some(conflicting) = self.draft.booking_for(&stored) {
            return Err(validation(format!(
                "{}: Venue '{}' is already booked by session '{}'.",
                context, stored, conflicting
            )));
        }

        let venue = self.draft.venues.get(&stored).cloned().unwrap_or_default();
        let attendees = expected_attendees.unwrap_or(0);
        if attendees > venue.capacity {
            return Err(validation(format!(
                "{}: Expected attendees ({}) exceeds venue capacity ({}).",
                context, attendees, venue.capacity
            )));
        }
        if requires_av.unwrap_or(false) && !venue.has_av_system {
            return Err(validation(format!(
                "{}: Session requires A/V, but venue '{}' does not have an A/V system.",
                context, stored
            )));
        }

        tracing::debug!(session = name, venue = %stored, "scheduling session");
        self.draft.venue_bookings.insert(stored.clone(), name.to_string());
        self.draft.sessions.push(Session {
            name: name.to_string(),
            hosted_by,
            in_venue: stored.clone(),
            expected_attendees,
            requires_av,
        });
        self.actions.push(format!("Scheduled session '{}' in venue '{}'", name, stored));
        Ok(())
    }

    /// Remove a session and free its venue. Admin or scheduler.
    pub fn cancel_session(&mut self, name: &str) -> Result<()> {
        self.require_role(SESSION_MANAGERS, format!("cancel session '{}'", name))?;
        let index = self
            .draft
            .sessions
            .iter()
            .position(|session| session.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| validation(format!("Session '{}' is not scheduled.", name)))?;

        let session = self.draft.sessions.remove(index);
        if self.draft.booking_for(&session.in_venue) == Some(session.name.as_str()) {
            self.draft.venue_bookings.remove(&session.in_venue);
        }

        tracing::debug!(session = %session.name, venue = %session.in_venue, "cancelled session");
        self.actions.push(format!("Cancelled session '{}'", session.name));
        Ok(())
    }

    /// Close the program: report what was done and hand back the draft.
    pub fn event_command(&self) -> EventOutcome {
        EventOutcome {
            message: format!("Execution successful. {}", self.actions.join(", ")),
            new_state: self.draft.clone(),
        }
    }

    fn apply(&mut self, command: Command) -> Result<()> {
        match command {
            Command::CreateVenue { name, properties } => self.create_venue(&name, &properties),
            Command::ModifyVenue { name, properties } => self.modify_venue(&name, &properties),
            Command::ScheduleSession { name, properties } => self.schedule_session(&name, &properties),
            Command::CancelSession { name } => self.cancel_session(&name),
        }
    }
}

fn apply_venue_properties(venue: &mut Venue, properties: &[VenueProperty]) {
    for property in properties {
        match property {
            VenueProperty::Capacity(capacity) => venue.capacity = *capacity,
            VenueProperty::HasAvSystem(flag) => venue.has_av_system = *flag,
        }
    }
}

impl Interpreter for EventInterpreter {
    type Output = EventOutcome;

    fn interpret(&mut self, root: Node) -> Result<EventOutcome> {
        self.reset();

        let mut children = root.into_branch("event_command")?.into_iter();
        let declared = children
            .next()
            .ok_or_else(|| unexpected("role name", "nothing"))?
            .into_text()?;
        self.enter_role(&declared)?;

        for child in children {
            let command = Command::from_node(child)?;
            self.apply(command)?;
        }

        let outcome = self.event_command();
        tracing::info!(
            role = %self.role,
            actions = self.actions.len(),
            venues = outcome.new_state.venues.len(),
            sessions = outcome.new_state.sessions.len(),
            "conference program succeeded"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> EventInterpreter {
        EventInterpreter::new(&ConferenceState::new(), Some("admin"))
    }

    #[test]
    fn roles_parse_case_insensitively() {
        assert_eq!(Role::parse("Admin"), Some(Role::Admin));
        assert_eq!(Role::parse(" scheduler "), Some(Role::Scheduler));
        assert_eq!(Role::parse("guest"), None);
    }

    #[test]
    fn create_venue_applies_defaults() {
        let mut interp = admin();
        interp.create_venue("Room A", &[]).unwrap();
        assert_eq!(interp.draft().venues["Room A"], Venue::default());
    }

    #[test]
    fn duplicate_venue_names_collide_ignoring_case() {
        let mut interp = admin();
        interp.create_venue("Room A", &[]).unwrap();
        let err = interp.create_venue("ROOM a", &[]).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn modify_venue_is_a_partial_update() {
        let mut interp = admin();
        interp
            .create_venue("Hall", &[VenueProperty::Capacity(50), VenueProperty::HasAvSystem(true)])
            .unwrap();
        interp.modify_venue("hall", &[VenueProperty::Capacity(80)]).unwrap();
        let hall = &interp.draft().venues["Hall"];
        assert_eq!(hall.capacity, 80);
        assert!(hall.has_av_system);
    }

    #[test]
    fn unknown_role_fails_every_gated_operation() {
        let mut interp = EventInterpreter::new(&ConferenceState::new(), Some("guest"));
        let err = interp.create_venue("Hall", &[]).unwrap_err();
        assert!(matches!(err, EngineError::RoleMismatch { .. }));
        let err = interp.schedule_session("Talk", &[]).unwrap_err();
        match err {
            EngineError::RoleMismatch { role, required, .. } => {
                assert_eq!(role, "guest");
                assert_eq!(required, "admin or scheduler");
            }
            other => panic!("expected role mismatch, got {other:?}"),
        }
    }

    #[test]
    fn whole_numbers_reject_fractions() {
        assert_eq!(whole_number("capacity", 40.0).unwrap(), 40);
        assert!(whole_number("capacity", 40.5).is_err());
    }

    #[test]
    fn declared_role_is_adopted_without_request_role() {
        let mut interp = EventInterpreter::new(&ConferenceState::new(), None);
        interp.enter_role("scheduler").unwrap();
        assert_eq!(interp.role(), "scheduler");
        assert!(interp.create_venue("Hall", &[]).is_err());
    }

    #[test]
    fn declared_role_must_match_request_role() {
        let mut interp = EventInterpreter::new(&ConferenceState::new(), Some("scheduler"));
        let err = interp.enter_role("admin").unwrap_err();
        assert!(matches!(err, EngineError::RoleMismatch { .. }));
    }
}
