use crate::engine::Domain;

const BILL_PROMPT: &str = r#"You are an assistant that translates natural language into a DSL for a bill.
The DSL format is:
bill {
  itemName: quantity * pricePerItem
}
Translate the user order into this DSL.
User Order: "{user_query}"
DSL Response:"#;

const RIDE_PROMPT: &str = r#"You are an assistant that translates natural language into a DSL for a bike ride.
The DSL format is:
ride {
  terrain: flat | hilly | mountainous
  distance_km: number
}
Translate the user request into this DSL.
User Request: "{user_query}"
DSL Response:"#;

const EVENT_PROMPT: &str = r#"From the user's request, extract the conference planning actions they want.
Return a single JSON object with these optional keys:
- role: "admin" or "scheduler", if the user states one.
- create_venues: list of venues with `name`, `capacity` (number) and `has_av_system` (boolean).
- modify_venues: list of venues with `name` and only the fields that change.
- sessions: list of sessions with `name`, `hosted_by` (string), `in_venue` (string), `expected_attendees` (number) and `requires_av` (boolean).
- cancel_sessions: list of session names.

User Request: "{user_query}"
JSON Response:"#;

/// Build the generation prompt for `domain`.
pub fn prompt_for(domain: Domain, user_query: &str) -> String {
    let template = match domain {
        Domain::Bill => BILL_PROMPT,
        Domain::Ride => RIDE_PROMPT,
        Domain::Event => EVENT_PROMPT,
    };
    template.replace("{user_query}", user_query)
}

/// Word the DSL block starts with, for domains answered in free text.
pub fn start_word(domain: Domain) -> Option<&'static str> {
    match domain {
        Domain::Bill => Some("bill"),
        Domain::Ride => Some("ride"),
        Domain::Event => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_is_substituted() {
        let prompt = prompt_for(Domain::Ride, "40km in the hills");
        assert!(prompt.contains("User Request: \"40km in the hills\""));
        assert!(!prompt.contains("{user_query}"));
    }
}
