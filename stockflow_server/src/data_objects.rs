use serde::{Deserialize, Serialize};
use stockflow_engine::{
    db_types::{Money, OrderId, OrderStatusType, PaymentEvent, TransferDirection},
    order_objects::{ExpiryResult, PaymentOutcome},
};

/// The body of the gateway's payment confirmation webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentNotification {
    pub transaction_id: String,
    pub content: String,
    pub amount: Money,
    #[serde(default = "incoming")]
    pub direction: TransferDirection,
}

fn incoming() -> TransferDirection {
    TransferDirection::In
}

impl From<PaymentNotification> for PaymentEvent {
    fn from(value: PaymentNotification) -> Self {
        Self {
            transaction_id: value.transaction_id,
            content: value.content,
            amount: value.amount,
            direction: value.direction,
        }
    }
}

/// The acknowledgement sent back to the gateway. It says whether the payment was taken, and nothing about the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAcknowledgement {
    pub accepted: bool,
    pub transaction_id: String,
}

impl PaymentAcknowledgement {
    pub fn new(transaction_id: String, outcome: &PaymentOutcome) -> Self {
        Self { accepted: outcome.is_accepted(), transaction_id }
    }
}

/// The gateway reports that a payment attempt for an order failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentFailureNotification {
    /// The order's payment reference (`ORD123`) or plain id.
    pub order_reference: String,
    #[serde(default)]
    pub reason: String,
}

/// The reply to a payment failure notification. `accepted` is false when the order could not be failed, without
/// saying why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentFailureAcknowledgement {
    pub accepted: bool,
    pub order_reference: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateParams {
    pub status: OrderStatusType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundParams {
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpirySummary {
    pub expired: Vec<OrderId>,
    pub skipped: usize,
    pub failed: Vec<OrderId>,
}

impl From<ExpiryResult> for ExpirySummary {
    fn from(result: ExpiryResult) -> Self {
        Self {
            expired: result.expired.iter().map(|o| o.id).collect(),
            skipped: result.skipped,
            failed: result.failed.iter().map(|(o, _)| o.id).collect(),
        }
    }
}
