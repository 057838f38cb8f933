//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every database call here is async, so a handler waiting on SQLite
//! yields its worker to other requests.
//!
//! Buyer routes identify the buyer with the [`AuthenticatedUser`] extractor. Admin routes are protected at the scope
//! level (see [`crate::server`]), as are the webhook routes.
use std::str::FromStr;

use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use log::*;
use stockflow_engine::{
    db_types::{OrderId, PaymentEvent},
    order_objects::{CheckoutRequest, OrderDetail, PaymentOutcome},
    traits::CheckoutDatabase,
    CheckoutError,
    OrderFlowApi,
};

use crate::{
    auth::AuthenticatedUser,
    config::ServerOptions,
    data_objects::{
        ExpirySummary,
        PaymentAcknowledgement,
        PaymentFailureAcknowledgement,
        PaymentFailureNotification,
        PaymentNotification,
        RefundParams,
        StatusUpdateParams,
    },
    errors::ServerError,
    helpers::get_remote_ip,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

fn parse_order_id(raw: &str) -> Result<OrderId, ServerError> {
    OrderId::from_str(raw).map_err(|e| ServerError::InvalidRequestPath(format!("{raw} is not a valid order id. {e}")))
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(quote => Post "/checkout/quote" impl CheckoutDatabase);
/// Prices the buyer's cart, including their rank discount, without placing an order.
pub async fn quote<B: CheckoutDatabase>(
    user: AuthenticatedUser,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST quote for {}", user.id());
    let quote = api.quote(user.id()).await?;
    Ok(HttpResponse::Ok().json(quote))
}

route!(checkout => Post "/checkout" impl CheckoutDatabase);
/// Turns the buyer's cart into an order and reserves its stock. The response carries the payment reference the buyer
/// must quote in their bank transfer.
pub async fn checkout<B: CheckoutDatabase>(
    user: AuthenticatedUser,
    body: web::Json<CheckoutRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST checkout for {}", user.id());
    let order = api.create_order(user.id(), body.into_inner()).await?;
    let items = api.db().fetch_order_items(order.id).await?;
    Ok(HttpResponse::Created().json(OrderDetail::new(order, items)))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(order_by_id => Get "/orders/{id}" impl CheckoutDatabase);
pub async fn order_by_id<B: CheckoutDatabase>(
    user: AuthenticatedUser,
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = parse_order_id(&path)?;
    debug!("💻️ GET order {id} for {}", user.id());
    let detail = api.order_detail(user.id(), id).await?;
    Ok(HttpResponse::Ok().json(detail))
}

route!(cancel_order => Post "/orders/{id}/cancel" impl CheckoutDatabase);
pub async fn cancel_order<B: CheckoutDatabase>(
    user: AuthenticatedUser,
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = parse_order_id(&path)?;
    debug!("💻️ POST cancel order {id} for {}", user.id());
    let order = api.cancel_order(user.id(), id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(awaiting_payment => Post "/orders/{id}/awaiting_payment" impl CheckoutDatabase);
/// Called once the buyer has been shown the payment instructions for the order.
pub async fn awaiting_payment<B: CheckoutDatabase>(
    user: AuthenticatedUser,
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = parse_order_id(&path)?;
    debug!("💻️ POST awaiting_payment for order {id} for {}", user.id());
    let order = api.mark_awaiting_payment(user.id(), id).await?;
    let items = api.db().fetch_order_items(id).await?;
    Ok(HttpResponse::Ok().json(OrderDetail::new(order, items)))
}

//----------------------------------------------   Webhooks  ----------------------------------------------------
route!(payment_webhook => Post "/payment" impl CheckoutDatabase);
/// The payment gateway's transfer confirmation.
///
/// Rejected payments are acknowledged with `200 OK` and `"accepted": false`. Only infrastructure failures return an
/// error status, and the gateway retries those.
pub async fn payment_webhook<B: CheckoutDatabase>(
    req: HttpRequest,
    body: web::Json<PaymentNotification>,
    api: web::Data<OrderFlowApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let peer = get_remote_ip(&req, options.use_x_forwarded_for, options.use_forwarded);
    let payment = PaymentEvent::from(body.into_inner());
    info!("💻️ Payment notification {} received from {peer:?}", payment.transaction_id);
    let txid = payment.transaction_id.clone();
    let outcome = api.handle_payment_event(payment).await?;
    if let PaymentOutcome::Rejected(reason) = &outcome {
        debug!("💻️ Payment notification {txid} was not accepted. {reason}");
    }
    Ok(HttpResponse::Ok().json(PaymentAcknowledgement::new(txid, &outcome)))
}

route!(payment_failed_webhook => Post "/payment_failed" impl CheckoutDatabase);
/// The payment gateway reports a failed payment attempt.
///
/// Unknown orders and orders that can no longer fail are acknowledged with `"accepted": false`, like rejected payments.
pub async fn payment_failed_webhook<B: CheckoutDatabase>(
    body: web::Json<PaymentFailureNotification>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let PaymentFailureNotification { order_reference, reason } = body.into_inner();
    let id = OrderId::from_str(&order_reference).map_err(|e| {
        ServerError::InvalidRequestBody(format!("{order_reference} is not a valid order reference. {e}"))
    })?;
    info!("💻️ Payment failure notification for order {id} received");
    let accepted = match api.handle_payment_failure(id, &reason).await {
        Ok(_) => true,
        Err(e @ (CheckoutError::OrderNotFound(_) | CheckoutError::InvalidOrderStateTransition(_))) => {
            debug!("💻️ Payment failure notification for order {id} was not accepted. {e}");
            false
        },
        Err(e) => return Err(e.into()),
    };
    Ok(HttpResponse::Ok().json(PaymentFailureAcknowledgement { accepted, order_reference }))
}

//----------------------------------------------   Admin  ----------------------------------------------------
route!(update_order_status => Patch "/orders/{id}/status" impl CheckoutDatabase);
/// Moves a paid order to its next fulfilment step.
pub async fn update_order_status<B: CheckoutDatabase>(
    path: web::Path<String>,
    body: web::Json<StatusUpdateParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = parse_order_id(&path)?;
    let StatusUpdateParams { status } = body.into_inner();
    info!("💻️ PATCH order {id} status to {status}");
    let order = api.advance_order_status(id, status).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(refund_order => Post "/orders/{id}/refund" impl CheckoutDatabase);
pub async fn refund_order<B: CheckoutDatabase>(
    path: web::Path<String>,
    body: web::Json<RefundParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = parse_order_id(&path)?;
    let RefundParams { reason } = body.into_inner();
    info!("💻️ POST refund for order {id}. Reason: {reason}");
    let order = api.refund_order(id, &reason).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(expire_orders => Post "/expire" impl CheckoutDatabase);
/// Runs an expiry sweep now, rather than waiting for the expiry worker.
pub async fn expire_orders<B: CheckoutDatabase>(api: web::Data<OrderFlowApi<B>>) -> Result<HttpResponse, ServerError> {
    info!("💻️ POST expire. Running an expiry sweep on demand");
    let result = api.expire_stale_orders(Utc::now()).await?;
    Ok(HttpResponse::Ok().json(ExpirySummary::from(result)))
}
