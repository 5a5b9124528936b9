//! Conference plans arrive from the model as JSON; this renders them as DSL.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

/// Venue fields for `create_venue`/`modify_venue`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VenuePlan {
    /// Venue name
    pub name: String,
    /// Seats, if mentioned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u64>,
    /// A/V availability, if mentioned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_av_system: Option<bool>,
}

/// Session fields for `schedule_session`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionPlan {
    /// Session name
    pub name: String,
    /// Speaker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosted_by: Option<String>,
    /// Venue name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_venue: Option<String>,
    /// Head count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_attendees: Option<u64>,
    /// Needs A/V
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_av: Option<bool>,
}

/// What the model extracted from a conference request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventPlan {
    /// Role the user claims
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Venues to create
    pub create_venues: Vec<VenuePlan>,
    /// Venues to change
    pub modify_venues: Vec<VenuePlan>,
    /// Sessions to schedule
    pub sessions: Vec<SessionPlan>,
    /// Session names to cancel
    pub cancel_sessions: Vec<String>,
}

/// Quote a string for the DSL, escaping `"` and `\`.
pub fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Render `plan` as an event program under `role`.
///
/// Commands are emitted cancellations first, then venue creation,
/// modification, and finally scheduling, so a single plan can free a venue
/// and rebook it.
pub fn assemble_event_dsl(plan: &EventPlan, role: &str) -> String {
    let mut dsl = String::new();
    let _ = writeln!(dsl, "role {} {{", quote(role));

    for name in &plan.cancel_sessions {
        let _ = writeln!(dsl, "  cancel_session {}", quote(name));
    }
    for venue in &plan.create_venues {
        write_venue(&mut dsl, "create_venue", venue);
    }
    for venue in &plan.modify_venues {
        write_venue(&mut dsl, "modify_venue", venue);
    }
    for session in &plan.sessions {
        let _ = writeln!(dsl, "  schedule_session {} {{", quote(&session.name));
        if let Some(speaker) = &session.hosted_by {
            let _ = writeln!(dsl, "    hosted_by: {}", quote(speaker));
        }
        if let Some(venue) = &session.in_venue {
            let _ = writeln!(dsl, "    in_venue: {}", quote(venue));
        }
        if let Some(count) = session.expected_attendees {
            let _ = writeln!(dsl, "    expected_attendees: {}", count);
        }
        if let Some(flag) = session.requires_av {
            let _ = writeln!(dsl, "    requires_av: {}", flag);
        }
        dsl.push_str("  }\n");
    }

    dsl.push('}');
    dsl
}

fn write_venue(dsl: &mut String, command: &str, venue: &VenuePlan) {
    let _ = writeln!(dsl, "  {} {} {{", command, quote(&venue.name));
    if let Some(capacity) = venue.capacity {
        let _ = writeln!(dsl, "    capacity: {}", capacity);
    }
    if let Some(flag) = venue.has_av_system {
        let _ = writeln!(dsl, "    has_av_system: {}", flag);
    }
    dsl.push_str("  }\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_escapes_quotes_and_backslashes() {
        assert_eq!(quote(r#"The "Big" Room\1"#), r#""The \"Big\" Room\\1""#);
    }

    #[test]
    fn renders_commands_in_dependency_order() {
        let plan: EventPlan = serde_json::from_value(serde_json::json!({
            "role": "admin",
            "sessions": [{"name": "Rust 101", "in_venue": "Room A", "expected_attendees": 30}],
            "create_venues": [{"name": "Room A", "capacity": 40, "has_av_system": true}]
        }))
        .unwrap();

        let dsl = assemble_event_dsl(&plan, "admin");
        let create = dsl.find("create_venue").unwrap();
        let schedule = dsl.find("schedule_session").unwrap();
        assert!(create < schedule);
        assert!(dsl.starts_with("role \"admin\" {"));
        assert!(dsl.contains("expected_attendees: 30"));
        assert!(!dsl.contains("requires_av"));
    }
}
