//! Domain interpreters.

/// Restaurant bills.
pub mod bill;
/// Conference venue and session planning.
pub mod event;
/// Bike ride planning.
pub mod ride;

pub use bill::{BillInterpreter, BillSummary};
pub use event::{ConferenceState, EventInterpreter, EventOutcome, Role};
pub use ride::{RideInterpreter, RidePlan};

use serde::{Deserialize, Serialize};

/// The result of any domain interpreter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DomainResult {
    /// A closed bill.
    Bill(BillSummary),
    /// A planned ride.
    Ride(RidePlan),
    /// A conference program outcome.
    Event(EventOutcome),
}

impl From<BillSummary> for DomainResult {
    fn from(summary: BillSummary) -> Self {
        DomainResult::Bill(summary)
    }
}

impl From<RidePlan> for DomainResult {
    fn from(plan: RidePlan) -> Self {
        DomainResult::Ride(plan)
    }
}

impl From<EventOutcome> for DomainResult {
    fn from(outcome: EventOutcome) -> Self {
        DomainResult::Event(outcome)
    }
}
