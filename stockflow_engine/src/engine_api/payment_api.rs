//! Payment reconciliation.
//!
//! The payment gateway confirms bank transfers out-of-band, and may deliver the same confirmation more than once.
//! Every delivery is written to the payment event audit log, whatever its outcome.
use chrono::Utc;
use log::*;

use crate::{
    db_types::{Order, OrderId, PaymentEvent, PaymentEventOutcome, PaymentStatusType, TransferDirection},
    engine_api::{
        errors::{CheckoutError, PaymentRejection},
        order_flow_api::OrderFlowApi,
        order_objects::PaymentOutcome,
    },
    events::{OrderAnnulledEvent, OrderPaidEvent},
    helpers::extract_order_reference,
    lifecycle::Annulment,
    traits::CheckoutDatabase,
};

impl<B> OrderFlowApi<B>
where B: CheckoutDatabase
{
    /// Reconciles a payment confirmation against the order referenced in its content.
    ///
    /// The event is rejected, leaving every order untouched, if
    /// * it is not an incoming transfer,
    /// * its content does not reference an existing order,
    /// * the order is not awaiting payment, or
    /// * the amount differs from the order total.
    ///
    /// Otherwise the order becomes `Processing`/`Paid` and its reserved stock is deducted permanently. Replaying a
    /// transfer that already paid for its order is accepted as a duplicate and changes nothing.
    ///
    /// `Err` is only returned for infrastructure failures.
    pub async fn handle_payment_event(&self, payment: PaymentEvent) -> Result<PaymentOutcome, CheckoutError> {
        let txid = payment.transaction_id.clone();
        trace!("💰️ Payment event {txid} received: {} '{}' ({})", payment.amount, payment.content, payment.direction);
        let order_id = extract_order_reference(&payment.content);
        let outcome = match (payment.direction, order_id) {
            (TransferDirection::Out, _) => PaymentOutcome::Rejected(PaymentRejection::UnrecognizedTransaction(
                "Outgoing transfers are not payments".into(),
            )),
            (TransferDirection::In, None) => PaymentOutcome::Rejected(PaymentRejection::UnrecognizedTransaction(
                "The transfer content does not reference an order".into(),
            )),
            (TransferDirection::In, Some(id)) => self.db().settle_payment(id, &payment).await?,
        };
        self.audit(&payment, order_id, &outcome).await?;
        match &outcome {
            PaymentOutcome::Accepted(order) => {
                info!("💰️ Order {} paid in full ({}) by transaction {txid}", order.id, order.total_amount);
                // The payment has committed by now. A stale rank is corrected on the next payment or refund.
                if let Err(e) = self.refresh_customer_rank(order.user_id).await {
                    error!("💰️ Could not refresh the rank of {} after payment {txid}. {e}", order.user_id);
                }
                self.producers().publish_order_paid(OrderPaidEvent::new(order.clone())).await;
            },
            PaymentOutcome::Duplicate(order) => {
                info!("💰️ Transaction {txid} has already been applied to order {}. Ignoring the replay", order.id);
            },
            PaymentOutcome::Rejected(reason) => {
                warn!("💰️ Payment event {txid} rejected. {reason}");
            },
        }
        Ok(outcome)
    }

    /// The gateway reports that the payment for the order failed. The order is cancelled with payment status
    /// `Failed` and its reservation is released.
    ///
    /// Reporting the failure again for an order that already failed returns the order unchanged.
    pub async fn handle_payment_failure(&self, id: OrderId, reason: &str) -> Result<Order, CheckoutError> {
        if let Some(order) = self.db().annul_order(id, None, Annulment::PaymentFailed, Utc::now()).await? {
            warn!("💰️ Payment for order {id} failed: {reason}. Its reservations have been released");
            let event = OrderAnnulledEvent::new(order.clone(), Annulment::PaymentFailed);
            self.producers().publish_order_annulled(event).await;
            return Ok(order);
        }
        let order = self.db().fetch_order(id).await?.ok_or(CheckoutError::OrderNotFound(id))?;
        if order.payment_status == PaymentStatusType::Failed {
            debug!("💰️ Order {id} has already been marked as failed");
            return Ok(order);
        }
        Err(CheckoutError::InvalidOrderStateTransition(format!(
            "Order {id} cannot fail payment. Its payment status is {}",
            order.payment_status
        )))
    }

    async fn audit(
        &self,
        payment: &PaymentEvent,
        order_id: Option<OrderId>,
        outcome: &PaymentOutcome,
    ) -> Result<(), CheckoutError> {
        let (kind, reason) = match outcome {
            PaymentOutcome::Accepted(_) => (PaymentEventOutcome::Accepted, None),
            PaymentOutcome::Duplicate(_) => (PaymentEventOutcome::Duplicate, None),
            PaymentOutcome::Rejected(r) => (PaymentEventOutcome::Rejected, Some(r.to_string())),
        };
        self.db().record_payment_event(payment, order_id, kind, reason).await
    }
}
