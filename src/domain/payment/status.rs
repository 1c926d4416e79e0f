//! Payment status state machine.
//!
//! Defines all possible payment states and valid transitions according
//! to the gateway payment lifecycle.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// Status of a payment attempt.
///
/// Represents the current position of a payment record in the
/// gateway-driven lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Status has not been established yet.
    /// Records never persist in this state; it exists as the parse
    /// fallback for unrecognized gateway values.
    Unknown,

    /// Checkout preference created, awaiting the gateway outcome.
    Pending,

    /// Payment collected successfully.
    Approved,

    /// Gateway declined the payment.
    Rejected,

    /// Payer or gateway cancelled before completion.
    Cancelled,

    /// Approved payment returned to the payer.
    Refunded,

    /// Approved payment reversed via dispute.
    ChargedBack,
}

impl PaymentStatus {
    /// Parse a gateway status string into a known variant.
    ///
    /// Returns `None` for unrecognized values so callers can decide
    /// whether to ignore or flag them.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" | "in_process" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            "refunded" => Some(Self::Refunded),
            "charged_back" => Some(Self::ChargedBack),
            _ => None,
        }
    }

    /// Convert to the canonical wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
            Self::ChargedBack => "charged_back",
        }
    }

    /// Returns true once no further transition is expected in normal flow.
    ///
    /// Terminal statuses end live-push subscriptions. Note that `Approved`
    /// is terminal for notification purposes even though refunds and
    /// chargebacks may still land on the record later.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Approved | Self::Rejected | Self::Cancelled | Self::Refunded | Self::ChargedBack
        )
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl StateMachine for PaymentStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, target),
            // From UNKNOWN
            (Unknown, Pending)
            // From PENDING
                | (Pending, Approved)
                | (Pending, Rejected)
                | (Pending, Cancelled)
            // From APPROVED - the only path into refund states
                | (Approved, Refunded)
                | (Approved, ChargedBack)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PaymentStatus::*;
        match self {
            Unknown => vec![Pending],
            Pending => vec![Approved, Rejected, Cancelled],
            Approved => vec![Refunded, ChargedBack],
            Rejected => vec![],
            Cancelled => vec![],
            Refunded => vec![],
            ChargedBack => vec![],
        }
    }
}
