//! Access control for the `/admin` scope.
//!
//! Back-office callers authenticate with a static bearer token (`Authorization: Bearer <SF_ADMIN_TOKEN>`). Requests
//! without the token are refused with 401, requests with the wrong token with 403. If no token has been configured,
//! every admin request is refused.
use std::{pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error,
};
use futures::{
    future::{ok, Ready},
    Future,
};
use log::*;
use stockflow_common::Secret;

use crate::errors::{AuthError, ServerError};

pub struct AdminTokenMiddlewareFactory {
    token: Secret<String>,
}

impl AdminTokenMiddlewareFactory {
    pub fn new(token: Secret<String>) -> Self {
        AdminTokenMiddlewareFactory { token }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminTokenMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AdminTokenMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AdminTokenMiddlewareService { token: self.token.clone(), service: Rc::new(service) })
    }
}

pub struct AdminTokenMiddlewareService<S> {
    token: Secret<String>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AdminTokenMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let authorization = req.headers().get(header::AUTHORIZATION).and_then(|v| v.to_str().ok());
        let check = check_admin_token(&self.token, authorization);
        Box::pin(async move {
            match check {
                Ok(()) => service.call(req).await,
                Err(e) => {
                    warn!("🔐️ Admin request to {} refused. {e}", req.path());
                    Err(ServerError::AuthenticationError(e).into())
                },
            }
        })
    }
}

fn check_admin_token(expected: &Secret<String>, authorization: Option<&str>) -> Result<(), AuthError> {
    if expected.is_empty() {
        return Err(AuthError::AdminDisabled);
    }
    let token = authorization
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingAdminToken)?;
    // Constant-time comparison
    let expected = expected.reveal().as_bytes();
    let matches = token.len() == expected.len() &&
        token.as_bytes().iter().zip(expected).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0;
    if matches {
        Ok(())
    } else {
        Err(AuthError::InvalidAdminToken)
    }
}
