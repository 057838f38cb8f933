use std::{fmt::Display, num::ParseIntError, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
pub use stockflow_common::Money;
use thiserror::Error;

/// Payment references embed the order id behind this prefix, e.g. `ORD1042`.
pub const ORDER_REFERENCE_PREFIX: &str = "ORD";

//--------------------------------------        OrderId        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub i64);

impl OrderId {
    pub fn value(&self) -> i64 {
        self.0
    }

    /// The reference a buyer must quote in the transfer content so that the payment can be matched to this order.
    pub fn payment_reference(&self) -> String {
        format!("{ORDER_REFERENCE_PREFIX}{}", self.0)
    }
}

impl From<i64> for OrderId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl FromStr for OrderId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let digits = s
            .get(..ORDER_REFERENCE_PREFIX.len())
            .filter(|p| p.eq_ignore_ascii_case(ORDER_REFERENCE_PREFIX))
            .map(|_| &s[ORDER_REFERENCE_PREFIX.len()..])
            .unwrap_or(s);
        digits.parse::<i64>().map(Self)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//--------------------------------------       ProductId       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct ProductId(pub i64);

impl From<i64> for ProductId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "P{}", self.0)
    }
}

//--------------------------------------         UserId        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl FromStr for UserId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(Self)
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "user {}", self.0)
    }
}

//--------------------------------------        Product        ---------------------------------------------------------
/// The slice of a catalog product that the order engine cares about.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    /// Units physically on hand.
    pub stock_quantity: i64,
    /// Units held against orders that have not been paid yet.
    pub reserved_quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn available(&self) -> i64 {
        self.stock_quantity - self.reserved_quantity
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: Money,
    pub stock_quantity: i64,
}

impl NewProduct {
    pub fn new<S: Into<String>>(name: S, price: Money, stock_quantity: i64) -> Self {
        Self { name: name.into(), price, stock_quantity }
    }
}

//--------------------------------------        CartItem       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl CartItem {
    pub fn new(product_id: ProductId, quantity: i64) -> Self {
        Self { product_id, quantity }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid status: {0}")]
pub struct ConversionError(String);

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
/// Fulfilment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// Created and waiting for payment.
    Pending,
    /// Paid for and being prepared.
    Processing,
    Shipped,
    Delivered,
    /// Cancelled by the buyer, by payment failure, or by expiry.
    Cancelled,
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "Pending"),
            OrderStatusType::Processing => write!(f, "Processing"),
            OrderStatusType::Shipped => write!(f, "Shipped"),
            OrderStatusType::Delivered => write!(f, "Delivered"),
            OrderStatusType::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Processing" => Ok(Self::Processing),
            "Shipped" => Ok(Self::Shipped),
            "Delivered" => Ok(Self::Delivered),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Pending");
            OrderStatusType::Pending
        })
    }
}

//--------------------------------------  PaymentStatusType    ---------------------------------------------------------
/// Payment status of an order. Reservations are held exactly while this is `Pending` or `Waiting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum PaymentStatusType {
    /// No payment instructions have been issued yet.
    Pending,
    /// Payment instructions (e.g. a transfer QR code) have been issued to the buyer.
    Waiting,
    Paid,
    Failed,
    Refunded,
    Cancelled,
}

impl Display for PaymentStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatusType::Pending => write!(f, "Pending"),
            PaymentStatusType::Waiting => write!(f, "Waiting"),
            PaymentStatusType::Paid => write!(f, "Paid"),
            PaymentStatusType::Failed => write!(f, "Failed"),
            PaymentStatusType::Refunded => write!(f, "Refunded"),
            PaymentStatusType::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for PaymentStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Waiting" => Ok(Self::Waiting),
            "Paid" => Ok(Self::Paid),
            "Failed" => Ok(Self::Failed),
            "Refunded" => Ok(Self::Refunded),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

//--------------------------------------         Order         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Unpaid orders are reclaimed by the expiry sweep once this time has passed.
    pub expires_at: DateTime<Utc>,
    pub status: OrderStatusType,
    pub payment_status: PaymentStatusType,
    /// The sum of the line items, before any rank discount.
    pub original_amount: Money,
    pub discount_amount: Money,
    /// The amount the buyer must pay.
    pub total_amount: Money,
    pub shipping_address: String,
    pub payment_method: String,
    pub note: Option<String>,
    /// The payment gateway's transaction id, once the order has been paid.
    pub transaction_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn is_awaiting_payment(&self) -> bool {
        self.payment_status.holds_reservation()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

//--------------------------------------       OrderItem       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i64,
    /// The unit price at the time the order was placed. Later price changes do not affect it.
    pub price_at_purchase: Money,
}

impl OrderItem {
    /// `None` if the line total does not fit in [`Money`].
    pub fn line_total(&self) -> Option<Money> {
        self.price_at_purchase.checked_mul(self.quantity)
    }
}

//--------------------------------------       NewOrder        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: i64,
    pub price_at_purchase: Money,
}

impl NewOrderItem {
    /// `None` if the line total does not fit in [`Money`].
    pub fn line_total(&self) -> Option<Money> {
        self.price_at_purchase.checked_mul(self.quantity)
    }
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
    pub original_amount: Money,
    pub discount_amount: Money,
    pub total_amount: Money,
    pub shipping_address: String,
    pub payment_method: String,
    pub note: Option<String>,
    pub items: Vec<NewOrderItem>,
}

impl NewOrder {
    /// A new, undiscounted order for the given items. `total` is the sum of the line totals, as priced at checkout.
    pub fn new(user_id: UserId, items: Vec<NewOrderItem>, total: Money, expires_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            expires_at,
            original_amount: total,
            discount_amount: Money::default(),
            total_amount: total,
            shipping_address: String::default(),
            payment_method: String::default(),
            note: None,
            items,
        }
    }

    pub fn with_discount(mut self, discount: Money) -> Self {
        self.discount_amount = discount;
        self.total_amount = self.original_amount - discount;
        self
    }

    pub fn with_shipping_address<S: Into<String>>(mut self, address: S) -> Self {
        self.shipping_address = address.into();
        self
    }

    pub fn with_payment_method<S: Into<String>>(mut self, method: S) -> Self {
        self.payment_method = method.into();
        self
    }

    pub fn with_note(mut self, note: Option<String>) -> Self {
        self.note = note;
        self
    }
}

//--------------------------------------   StockReservation    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum ReservationState {
    /// Stock is counted in `reserved_quantity`.
    Held,
    /// The hold was returned to available stock.
    Released,
    /// The hold was turned into a permanent stock deduction after payment.
    Consumed,
}

impl Display for ReservationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReservationState::Held => write!(f, "Held"),
            ReservationState::Released => write!(f, "Released"),
            ReservationState::Consumed => write!(f, "Consumed"),
        }
    }
}

/// One row of the reservation ledger. Each order item has exactly one, and it leaves `Held` at most once.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct StockReservation {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub state: ReservationState,
    pub created_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

//--------------------------------------     PaymentEvent      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferDirection {
    In,
    Out,
}

impl Display for TransferDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferDirection::In => write!(f, "in"),
            TransferDirection::Out => write!(f, "out"),
        }
    }
}

/// A payment confirmation delivered by the payment gateway. Delivery is at-least-once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEvent {
    /// The gateway's transaction id.
    pub transaction_id: String,
    /// Free-text transfer content. Expected to contain the order's payment reference.
    pub content: String,
    pub amount: Money,
    pub direction: TransferDirection,
}

impl PaymentEvent {
    pub fn incoming<S1: Into<String>, S2: Into<String>>(transaction_id: S1, content: S2, amount: Money) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            content: content.into(),
            amount,
            direction: TransferDirection::In,
        }
    }
}

//--------------------------------------  PaymentEventRecord   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentEventOutcome {
    Accepted,
    /// A repeat delivery of a transfer that has already settled its order.
    Duplicate,
    Rejected,
}

impl Display for PaymentEventOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentEventOutcome::Accepted => write!(f, "Accepted"),
            PaymentEventOutcome::Duplicate => write!(f, "Duplicate"),
            PaymentEventOutcome::Rejected => write!(f, "Rejected"),
        }
    }
}

/// An entry in the payment event audit log. Every delivery is recorded, including duplicates and rejections.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PaymentEventRecord {
    pub id: i64,
    pub transaction_id: String,
    pub content: String,
    pub amount: Money,
    pub direction: TransferDirection,
    pub order_id: Option<OrderId>,
    pub outcome: PaymentEventOutcome,
    pub reason: Option<String>,
    pub received_at: DateTime<Utc>,
}

//--------------------------------------         Tier          ---------------------------------------------------------
/// Customer rank. Higher tiers earn a larger checkout discount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
pub enum Tier {
    #[default]
    Bronze,
    Silver,
    Gold,
    Diamond,
}

impl Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Bronze => write!(f, "Bronze"),
            Tier::Silver => write!(f, "Silver"),
            Tier::Gold => write!(f, "Gold"),
            Tier::Diamond => write!(f, "Diamond"),
        }
    }
}

impl FromStr for Tier {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bronze" => Ok(Self::Bronze),
            "silver" => Ok(Self::Silver),
            "gold" => Ok(Self::Gold),
            "diamond" => Ok(Self::Diamond),
            _ => Err(ConversionError(format!("Invalid tier: {s}"))),
        }
    }
}
