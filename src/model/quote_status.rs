//! Quote lifecycle states and the transition table.
//!
//! Every status change in the service goes through [`QuoteStatus::transition`];
//! no other code path assigns a status derived from the current one.
//!
//! Pricing is only possible from `pending`, `reviewing` or `quoted`; once a
//! quote is `accepted` its agreed cost is fixed and set price is rejected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a quote request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    /// Submitted, not yet looked at by staff.
    Pending,
    /// Staff is preparing a price.
    Reviewing,
    /// A price has been sent to the customer.
    Quoted,
    /// The price was accepted; payment may be taken.
    Accepted,
    /// The move is done.
    Completed,
    /// Staff declined the request.
    Rejected,
    /// Withdrawn by the customer or by staff.
    Cancelled,
}

impl QuoteStatus {
    pub const ALL: [QuoteStatus; 7] = [
        QuoteStatus::Pending,
        QuoteStatus::Reviewing,
        QuoteStatus::Quoted,
        QuoteStatus::Accepted,
        QuoteStatus::Completed,
        QuoteStatus::Rejected,
        QuoteStatus::Cancelled,
    ];

    /// Returns the canonical storage representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            QuoteStatus::Pending => "pending",
            QuoteStatus::Reviewing => "reviewing",
            QuoteStatus::Quoted => "quoted",
            QuoteStatus::Accepted => "accepted",
            QuoteStatus::Completed => "completed",
            QuoteStatus::Rejected => "rejected",
            QuoteStatus::Cancelled => "cancelled",
        }
    }

    /// Terminal states accept no further transition.
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            QuoteStatus::Completed | QuoteStatus::Rejected | QuoteStatus::Cancelled
        )
    }

    /// Applies `trigger` to the current state and returns the resulting state.
    ///
    /// Triggers that do not move the status (payment, self-service delete)
    /// return the current state when they are permitted.
    pub fn transition(
        self,
        trigger: LifecycleTrigger,
        policy: &LifecyclePolicy,
    ) -> Result<QuoteStatus, TransitionError> {
        use QuoteStatus::*;

        if self.is_terminal() {
            return Err(self.reject(
                trigger,
                format!("quote is {} and can no longer change", self),
            ));
        }

        match trigger {
            LifecycleTrigger::SetPrice => match self {
                Pending | Reviewing | Quoted => Ok(Quoted),
                _ => Err(self.reject(trigger, "quote can only be priced before it is accepted")),
            },
            LifecycleTrigger::OwnerAccept => match self {
                Quoted => Ok(Accepted),
                _ => Err(self.reject(trigger, "quote must be quoted before it can be accepted")),
            },
            LifecycleTrigger::StaffAccept => match self {
                Quoted => Ok(Accepted),
                Pending | Reviewing if !policy.staff_accept_requires_quoted => Ok(Accepted),
                _ => Err(self.reject(trigger, "quote must be quoted before it can be accepted")),
            },
            LifecycleTrigger::SubmitPayment => match self {
                Accepted => Ok(Accepted),
                _ => Err(self.reject(trigger, "payment can only be made once the quote is accepted")),
            },
            LifecycleTrigger::OwnerCancel => match self {
                Pending | Reviewing | Quoted => Ok(Cancelled),
                _ => Err(self.reject(trigger, "quote can only be cancelled before it is accepted")),
            },
            LifecycleTrigger::OwnerDelete => match self {
                Pending | Reviewing => Ok(self),
                _ => Err(self.reject(trigger, "only pending or reviewing quotes can be deleted")),
            },
            LifecycleTrigger::StaffUpdate(target) => match target {
                Pending => Err(self.reject(trigger, "a quote cannot be moved back to pending")),
                Reviewing => match self {
                    Pending => Ok(Reviewing),
                    _ => Err(self.reject(trigger, "only pending quotes can be moved to review")),
                },
                Quoted => Err(self.reject(trigger, "set a price to move a quote to quoted")),
                Accepted => self.transition(LifecycleTrigger::StaffAccept, policy),
                Completed | Rejected | Cancelled => Ok(target),
            },
        }
    }

    fn reject(self, trigger: LifecycleTrigger, reason: impl Into<String>) -> TransitionError {
        TransitionError {
            current: self,
            trigger,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown quote status: {0}")]
pub struct ParseQuoteStatusError(pub String);

impl FromStr for QuoteStatus {
    type Err = ParseQuoteStatusError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        QuoteStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| ParseQuoteStatusError(value.to_string()))
    }
}

/// The intent behind a lifecycle operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleTrigger {
    SetPrice,
    OwnerAccept,
    StaffAccept,
    SubmitPayment,
    OwnerCancel,
    OwnerDelete,
    /// Generic staff status update towards the given target.
    StaffUpdate(QuoteStatus),
}

/// Deployment policy knobs for the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecyclePolicy {
    /// When false, staff may accept a quote that was never priced.
    pub staff_accept_requires_quoted: bool,
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        LifecyclePolicy {
            staff_accept_requires_quoted: true,
        }
    }
}

/// A trigger that is illegal from the current state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason} (current status: {current})")]
pub struct TransitionError {
    pub current: QuoteStatus,
    pub trigger: LifecycleTrigger,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use QuoteStatus::*;

    fn all_triggers() -> Vec<LifecycleTrigger> {
        let mut triggers = vec![
            LifecycleTrigger::SetPrice,
            LifecycleTrigger::OwnerAccept,
            LifecycleTrigger::StaffAccept,
            LifecycleTrigger::SubmitPayment,
            LifecycleTrigger::OwnerCancel,
            LifecycleTrigger::OwnerDelete,
        ];
        triggers.extend(QuoteStatus::ALL.into_iter().map(LifecycleTrigger::StaffUpdate));
        triggers
    }

    /// Independent listing of every legal edge under the default policy.
    fn expected_edge(from: QuoteStatus, trigger: LifecycleTrigger) -> Option<QuoteStatus> {
        let edges: &[(QuoteStatus, LifecycleTrigger, QuoteStatus)] = &[
            (Pending, LifecycleTrigger::SetPrice, Quoted),
            (Reviewing, LifecycleTrigger::SetPrice, Quoted),
            (Quoted, LifecycleTrigger::SetPrice, Quoted),
            (Quoted, LifecycleTrigger::OwnerAccept, Accepted),
            (Quoted, LifecycleTrigger::StaffAccept, Accepted),
            (Quoted, LifecycleTrigger::StaffUpdate(Accepted), Accepted),
            (Accepted, LifecycleTrigger::SubmitPayment, Accepted),
            (Pending, LifecycleTrigger::OwnerCancel, Cancelled),
            (Reviewing, LifecycleTrigger::OwnerCancel, Cancelled),
            (Quoted, LifecycleTrigger::OwnerCancel, Cancelled),
            (Pending, LifecycleTrigger::OwnerDelete, Pending),
            (Reviewing, LifecycleTrigger::OwnerDelete, Reviewing),
            (Pending, LifecycleTrigger::StaffUpdate(Reviewing), Reviewing),
        ];
        if let Some((_, _, to)) = edges.iter().find(|(f, t, _)| *f == from && *t == trigger) {
            return Some(*to);
        }
        match trigger {
            LifecycleTrigger::StaffUpdate(target @ (Completed | Rejected | Cancelled))
                if !from.is_terminal() =>
            {
                Some(target)
            }
            _ => None,
        }
    }

    #[test]
    fn test_every_state_trigger_pair_follows_table() {
        let policy = LifecyclePolicy::default();
        for from in QuoteStatus::ALL {
            for trigger in all_triggers() {
                let result = from.transition(trigger, &policy);
                match expected_edge(from, trigger) {
                    Some(to) => assert_eq!(result, Ok(to), "{from:?} --{trigger:?}-->"),
                    None => {
                        let err = result.expect_err(&format!("{from:?} --{trigger:?}--> should fail"));
                        assert_eq!(err.current, from);
                        assert_eq!(err.trigger, trigger);
                    }
                }
            }
        }
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        let policy = LifecyclePolicy {
            staff_accept_requires_quoted: false,
        };
        for from in [Completed, Rejected, Cancelled] {
            assert!(from.is_terminal());
            for trigger in all_triggers() {
                assert!(from.transition(trigger, &policy).is_err());
            }
        }
    }

    #[test]
    fn test_accepted_quote_cannot_be_repriced() {
        let err = QuoteStatus::Accepted
            .transition(LifecycleTrigger::SetPrice, &LifecyclePolicy::default())
            .unwrap_err();
        assert_eq!(err.current, QuoteStatus::Accepted);
    }

    #[test]
    fn test_owner_accept_only_from_quoted() {
        let policy = LifecyclePolicy::default();
        for from in QuoteStatus::ALL {
            let result = from.transition(LifecycleTrigger::OwnerAccept, &policy);
            assert_eq!(result.is_ok(), from == Quoted, "{from:?}");
        }
    }

    #[test]
    fn test_reaccept_is_rejected_even_with_staff_bypass() {
        let policy = LifecyclePolicy {
            staff_accept_requires_quoted: false,
        };
        let err = Accepted
            .transition(LifecycleTrigger::StaffAccept, &policy)
            .unwrap_err();
        assert_eq!(err.current, Accepted);
    }

    #[test]
    fn test_staff_bypass_policy_widens_staff_accept_only() {
        let policy = LifecyclePolicy {
            staff_accept_requires_quoted: false,
        };
        assert_eq!(Pending.transition(LifecycleTrigger::StaffAccept, &policy), Ok(Accepted));
        assert_eq!(
            Reviewing.transition(LifecycleTrigger::StaffUpdate(Accepted), &policy),
            Ok(Accepted)
        );
        assert!(Pending.transition(LifecycleTrigger::OwnerAccept, &policy).is_err());
    }

    #[test]
    fn test_transition_error_message_names_current_status() {
        let err = Pending
            .transition(LifecycleTrigger::OwnerAccept, &LifecyclePolicy::default())
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("quoted"));
        assert!(message.contains("current status: pending"));
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("Quoted".parse::<QuoteStatus>(), Ok(Quoted));
        assert_eq!(" cancelled ".parse::<QuoteStatus>(), Ok(Cancelled));
        assert!("approved".parse::<QuoteStatus>().is_err());
        for status in QuoteStatus::ALL {
            assert_eq!(status.as_str().parse::<QuoteStatus>(), Ok(status));
        }
    }
}
