use chrono::{DateTime, Utc};
use mockall::mock;
use stockflow_engine::{
    db_types::{
        CartItem,
        Money,
        NewOrder,
        Order,
        OrderId,
        OrderItem,
        OrderStatusType,
        PaymentEvent,
        PaymentEventOutcome,
        PaymentEventRecord,
        Product,
        ProductId,
        StockReservation,
        Tier,
        UserId,
    },
    lifecycle::Annulment,
    order_objects::PaymentOutcome,
    traits::{CartManagement, CatalogManagement, CheckoutDatabase, CustomerRanks, OrderManagement},
    CheckoutError,
};

mock! {
    pub Store {}
    impl Clone for Store {
        fn clone(&self) -> Self;
    }
    impl CatalogManagement for Store {
        async fn fetch_product(&self, id: ProductId) -> Result<Option<Product>, CheckoutError>;
    }
    impl CartManagement for Store {
        async fn fetch_cart_items(&self, user: UserId) -> Result<Vec<CartItem>, CheckoutError>;
        async fn clear_cart(&self, user: UserId) -> Result<(), CheckoutError>;
    }
    impl CustomerRanks for Store {
        async fn fetch_historical_spend(&self, user: UserId) -> Result<Money, CheckoutError>;
        async fn fetch_rank(&self, user: UserId) -> Result<Tier, CheckoutError>;
        async fn update_rank(&self, user: UserId, tier: Tier) -> Result<(), CheckoutError>;
    }
    impl OrderManagement for Store {
        async fn fetch_order(&self, id: OrderId) -> Result<Option<Order>, CheckoutError>;
        async fn fetch_order_items(&self, id: OrderId) -> Result<Vec<OrderItem>, CheckoutError>;
        async fn fetch_orders_for_user(&self, user: UserId) -> Result<Vec<Order>, CheckoutError>;
        async fn fetch_expired_orders(&self, now: DateTime<Utc>) -> Result<Vec<Order>, CheckoutError>;
        async fn fetch_reservations(&self, id: OrderId) -> Result<Vec<StockReservation>, CheckoutError>;
        async fn fetch_payment_events(&self, transaction_id: &str) -> Result<Vec<PaymentEventRecord>, CheckoutError>;
    }
    impl CheckoutDatabase for Store {
        fn url(&self) -> &str;
        async fn insert_order_with_reservations(&self, order: NewOrder) -> Result<(Order, Vec<OrderItem>), CheckoutError>;
        async fn annul_order(&self, id: OrderId, user: Option<UserId>, annulment: Annulment, now: DateTime<Utc>) -> Result<Option<Order>, CheckoutError>;
        async fn mark_awaiting_payment(&self, id: OrderId, user: UserId, now: DateTime<Utc>) -> Result<Option<Order>, CheckoutError>;
        async fn settle_payment(&self, id: OrderId, payment: &PaymentEvent) -> Result<PaymentOutcome, CheckoutError>;
        async fn record_payment_event(&self, payment: &PaymentEvent, order_id: Option<OrderId>, outcome: PaymentEventOutcome, reason: Option<String>) -> Result<(), CheckoutError>;
        async fn update_fulfilment_status(&self, id: OrderId, from: OrderStatusType, to: OrderStatusType) -> Result<Option<Order>, CheckoutError>;
        async fn refund_order(&self, id: OrderId) -> Result<Option<Order>, CheckoutError>;
        async fn close(&mut self) -> Result<(), CheckoutError>;
    }
}
