//! Buyer identity.
//!
//! Stockflow sits behind an authentication gateway that has already verified the buyer's session. The gateway passes
//! the buyer's id on in the `X-User-Id` header. Handlers that act on behalf of a buyer take an [`AuthenticatedUser`]
//! argument, which refuses the request if the header is missing or malformed.
use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use log::*;
use stockflow_engine::db_types::UserId;

use crate::errors::{AuthError, ServerError};

pub const USER_ID_HEADER: &str = "X-User-Id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub UserId);

impl AuthenticatedUser {
    pub fn id(&self) -> UserId {
        self.0
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(user_from_request(req))
    }
}

fn user_from_request(req: &HttpRequest) -> Result<AuthenticatedUser, ServerError> {
    let value = req.headers().get(USER_ID_HEADER).ok_or_else(|| {
        debug!("💻️ Request to {} has no {USER_ID_HEADER} header", req.path());
        AuthError::MissingUserId
    })?;
    let value = value.to_str().map_err(|e| AuthError::InvalidUserId(e.to_string()))?;
    let user = value.parse::<UserId>().map_err(|e| AuthError::InvalidUserId(e.to_string()))?;
    if user.0 <= 0 {
        return Err(AuthError::InvalidUserId(format!("{value} is not a positive number")).into());
    }
    Ok(AuthenticatedUser(user))
}
