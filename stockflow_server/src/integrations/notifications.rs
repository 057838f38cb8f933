//! Buyer notifications.
//!
//! Order lifecycle events are turned into notifications for the buyer: an order confirmation with payment
//! instructions, a payment receipt, and a cancellation notice. Delivery (email, SMS, push) belongs to a separate
//! service; this module renders the notification and hands it to the `sf::notifications` log target, which that
//! service tails.
use futures::future::BoxFuture;
use log::*;
use stockflow_engine::{
    db_types::Order,
    events::{EventHandlers, EventHooks, OrderAnnulledEvent, OrderCreatedEvent, OrderPaidEvent},
    lifecycle::Annulment,
};

pub const NOTIFICATION_EVENT_BUFFER_SIZE: usize = 25;
const NOTIFICATION_TARGET: &str = "sf::notifications";

/// A message for the buyer of an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub order: Order,
    pub subject: String,
    pub body: String,
}

impl Notification {
    pub fn order_confirmation(ev: &OrderCreatedEvent) -> Self {
        let order = &ev.order;
        let subject = format!("Order {} received", order.id);
        let body = format!(
            "Thank you for your order of {} item(s). Please transfer {} and include the reference {} in the transfer \
             content. Your items are held for you until {}.",
            ev.items.len(),
            order.total_amount,
            order.id.payment_reference(),
            order.expires_at.format("%H:%M on %d/%m/%Y UTC")
        );
        Self { order: order.clone(), subject, body }
    }

    pub fn payment_receipt(ev: &OrderPaidEvent) -> Self {
        let order = &ev.order;
        let subject = format!("Payment received for order {}", order.id);
        let body = format!("We have received your payment of {}. Your order is being prepared.", order.total_amount);
        Self { order: order.clone(), subject, body }
    }

    pub fn cancellation(ev: &OrderAnnulledEvent) -> Self {
        let order = &ev.order;
        let subject = format!("Order {} cancelled", order.id);
        let body = match ev.annulment {
            Annulment::PaymentFailed => "Your payment could not be completed, so your order has been cancelled.",
            Annulment::Expired => "We did not receive your payment in time, so your order has been cancelled.",
            Annulment::Cancelled => "Your order has been cancelled at your request.",
        };
        Self { order: order.clone(), subject, body: body.to_string() }
    }

    fn dispatch(self) -> BoxFuture<'static, ()> {
        info!(
            target: NOTIFICATION_TARGET,
            "user={} order={} subject=\"{}\" body=\"{}\"",
            self.order.user_id.0,
            self.order.id.payment_reference(),
            self.subject,
            self.body
        );
        Box::pin(async {})
    }
}

/// Subscribes the buyer notifications to the order lifecycle events.
pub fn create_notification_event_handlers() -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks
        .on_order_created(|ev| Notification::order_confirmation(&ev).dispatch())
        .on_order_paid(|ev| Notification::payment_receipt(&ev).dispatch())
        .on_order_annulled(|ev| {
            debug!("📬️ Order {} {} with payment status {}", ev.order.id, ev.annulment, ev.payment_status);
            Notification::cancellation(&ev).dispatch()
        });
    EventHandlers::new(NOTIFICATION_EVENT_BUFFER_SIZE, hooks)
}
