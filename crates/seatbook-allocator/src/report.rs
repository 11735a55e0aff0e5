//! Outcome of an allocation run.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::Serialize;

use seatbook_core::types::{BookingId, RequesterId, SeatNumber};
use seatbook_entity::user::User;

/// Why a requester ended the run without a seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FailureReason {
    /// Every attempt lost its race or found no free seat.
    NoResourceAvailable {
        /// Cause of the final failed attempt.
        last_cause: String,
    },
    /// The store reported a seat as already owned while this requester held
    /// its lock, and the retry budget ran out.
    Conflict {
        /// Store message for the conflicting write.
        message: String,
    },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoResourceAvailable { last_cause } => {
                write!(f, "no seat available ({last_cause})")
            }
            Self::Conflict { message } => write!(f, "conflicting claim ({message})"),
        }
    }
}

/// Terminal result of one requester's task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClaimResult {
    /// The requester now owns this seat.
    Claimed {
        /// Seat row id.
        booking_id: BookingId,
        /// Seat label.
        seat_number: SeatNumber,
    },
    /// The requester got no seat.
    Failed {
        /// Why.
        reason: FailureReason,
    },
}

/// One requester's entry in the report.
#[derive(Debug, Clone, Serialize)]
pub struct AllocationOutcome {
    /// The requester.
    pub requester: User,
    /// Claim attempts made, including the successful one.
    pub attempts: u32,
    /// What happened.
    pub result: ClaimResult,
}

impl AllocationOutcome {
    /// Whether the requester got a seat.
    pub fn is_claimed(&self) -> bool {
        matches!(self.result, ClaimResult::Claimed { .. })
    }

    /// The claimed seat, if any.
    pub fn seat(&self) -> Option<&SeatNumber> {
        match &self.result {
            ClaimResult::Claimed { seat_number, .. } => Some(seat_number),
            ClaimResult::Failed { .. } => None,
        }
    }

    /// The failure reason, if any.
    pub fn failure(&self) -> Option<&FailureReason> {
        match &self.result {
            ClaimResult::Claimed { .. } => None,
            ClaimResult::Failed { reason } => Some(reason),
        }
    }
}

/// Per-requester outcomes of one `allocate` call, in input order.
#[derive(Debug, Clone, Serialize)]
pub struct AllocationReport {
    outcomes: Vec<AllocationOutcome>,
    elapsed: Duration,
}

impl AllocationReport {
    /// Assemble a report.
    pub fn new(outcomes: Vec<AllocationOutcome>, elapsed: Duration) -> Self {
        Self { outcomes, elapsed }
    }

    /// All outcomes in input order.
    pub fn outcomes(&self) -> &[AllocationOutcome] {
        &self.outcomes
    }

    /// Wall-clock time of the whole run.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Number of requesters that got a seat.
    pub fn claimed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_claimed()).count()
    }

    /// Number of requesters that got no seat.
    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.claimed_count()
    }

    /// Number of requesters whose final failure was a conflicting write.
    pub fn conflict_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.failure(), Some(FailureReason::Conflict { .. })))
            .count()
    }

    /// Total claim attempts across all requesters.
    pub fn total_attempts(&self) -> u64 {
        self.outcomes.iter().map(|o| u64::from(o.attempts)).sum()
    }

    /// Requester to seat mapping for every successful claim.
    pub fn assignments(&self) -> BTreeMap<RequesterId, SeatNumber> {
        self.outcomes
            .iter()
            .filter_map(|o| o.seat().map(|s| (o.requester.user_id, s.clone())))
            .collect()
    }

    /// Outcomes that ended without a seat.
    pub fn failures(&self) -> impl Iterator<Item = &AllocationOutcome> {
        self.outcomes.iter().filter(|o| !o.is_claimed())
    }

    /// Outcome for a given requester.
    pub fn outcome_for(&self, requester: RequesterId) -> Option<&AllocationOutcome> {
        self.outcomes.iter().find(|o| o.requester.user_id == requester)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claimed(id: i32, booking: i32, seat: &str) -> AllocationOutcome {
        AllocationOutcome {
            requester: User::new(id, format!("User {id}")),
            attempts: 1,
            result: ClaimResult::Claimed {
                booking_id: BookingId(booking),
                seat_number: seat.parse().unwrap(),
            },
        }
    }

    fn failed(id: i32, reason: FailureReason) -> AllocationOutcome {
        AllocationOutcome {
            requester: User::new(id, format!("User {id}")),
            attempts: 5,
            result: ClaimResult::Failed { reason },
        }
    }

    #[test]
    fn test_counts_and_assignments() {
        let report = AllocationReport::new(
            vec![
                claimed(2, 1, "1A"),
                failed(
                    3,
                    FailureReason::NoResourceAvailable {
                        last_cause: "no unlocked seat".to_string(),
                    },
                ),
                claimed(1, 2, "1B"),
                failed(
                    4,
                    FailureReason::Conflict {
                        message: "taken".to_string(),
                    },
                ),
            ],
            Duration::from_millis(12),
        );

        assert_eq!(report.claimed_count(), 2);
        assert_eq!(report.failed_count(), 2);
        assert_eq!(report.conflict_count(), 1);
        assert_eq!(report.total_attempts(), 12);

        let assignments = report.assignments();
        let keys: Vec<i32> = assignments.keys().map(|k| k.get()).collect();
        assert_eq!(keys, vec![1, 2]);
        assert_eq!(assignments[&RequesterId(1)].as_str(), "1B");

        let failing: Vec<i32> = report.failures().map(|o| o.requester.user_id.get()).collect();
        assert_eq!(failing, vec![3, 4]);
        assert!(report.outcome_for(RequesterId(9)).is_none());
    }

    #[test]
    fn test_serializes_tagged_results() {
        let report = AllocationReport::new(vec![claimed(1, 7, "2C")], Duration::ZERO);
        let json = serde_json::to_value(&report).unwrap();
        let result = &json["outcomes"][0]["result"];
        assert_eq!(result["status"], "claimed");
        assert_eq!(result["seat_number"], "2C");
        assert_eq!(result["booking_id"], 7);
    }
}
