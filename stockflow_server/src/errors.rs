use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::error;
use stockflow_engine::CheckoutError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("{0}")]
    CheckoutError(#[from] CheckoutError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingUserId => StatusCode::UNAUTHORIZED,
                AuthError::InvalidUserId(_) => StatusCode::BAD_REQUEST,
                AuthError::MissingAdminToken => StatusCode::UNAUTHORIZED,
                AuthError::InvalidAdminToken => StatusCode::FORBIDDEN,
                AuthError::AdminDisabled => StatusCode::FORBIDDEN,
            },
            Self::CheckoutError(e) => checkout_status_code(e),
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = if status.is_server_error() {
            error!("💻️ {self}");
            "An internal error occurred. Please try again later.".to_string()
        } else {
            self.to_string()
        };
        HttpResponse::build(status)
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": message }).to_string())
    }
}

fn checkout_status_code(e: &CheckoutError) -> StatusCode {
    match e {
        CheckoutError::CartEmpty => StatusCode::UNPROCESSABLE_ENTITY,
        CheckoutError::ProductNotFound(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CheckoutError::InvalidQuantity { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        CheckoutError::InvalidPrice { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        CheckoutError::AmountOverflow(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CheckoutError::InsufficientStock { .. } => StatusCode::CONFLICT,
        CheckoutError::OrderCreationFailed(cause) => checkout_status_code(cause),
        CheckoutError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        CheckoutError::InvalidOrderStateTransition(_) => StatusCode::CONFLICT,
        CheckoutError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("The X-User-Id header was not provided.")]
    MissingUserId,
    #[error("The X-User-Id header is not a valid user id. {0}")]
    InvalidUserId(String),
    #[error("An admin bearer token is required.")]
    MissingAdminToken,
    #[error("The admin token is invalid.")]
    InvalidAdminToken,
    #[error("Admin access has not been configured on this server.")]
    AdminDisabled,
}
