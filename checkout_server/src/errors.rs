use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use checkout_engine::traits::{CartError, CheckoutError, InventoryError, OrderLifecycleError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("Could not read request body. {0}")]
    InvalidRequestBody(String),
    #[error("No customer identity was supplied with the request")]
    Unauthenticated,
    #[error("This endpoint requires storefront admin rights")]
    Forbidden,
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),
    #[error("Order error: {0}")]
    OrderLifecycle(#[from] OrderLifecycleError),
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),
    #[error("Server error: {0}")]
    Unspecified(String),
}

impl From<std::io::Error> for ServerError {
    fn from(e: std::io::Error) -> Self {
        ServerError::InitializeError(e.to_string())
    }
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InitializeError(_) | Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Cart(e) => cart_status(e),
            Self::Checkout(e) => checkout_status(e),
            Self::OrderLifecycle(e) => lifecycle_status(e),
            Self::Inventory(e) => inventory_status(e),
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({"error": self.to_string()}))
    }
}

fn cart_status(e: &CartError) -> StatusCode {
    match e {
        CartError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        CartError::ProductNotFound(_) | CartError::CartNotFound | CartError::ItemNotInCart(_) => {
            StatusCode::NOT_FOUND
        },
        CartError::InsufficientStock { .. } => StatusCode::CONFLICT,
        CartError::ProductUnavailable(_) |
        CartError::EmptyCart |
        CartError::InvalidQuantity => StatusCode::BAD_REQUEST,
    }
}

fn checkout_status(e: &CheckoutError) -> StatusCode {
    match e {
        CheckoutError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        CheckoutError::EmptyCart |
        CheckoutError::IncompleteAddress { .. } |
        CheckoutError::NoAddressAvailable |
        CheckoutError::MissingCustomerEmail |
        CheckoutError::ProductUnavailable(_) => StatusCode::BAD_REQUEST,
        CheckoutError::InsufficientStock { .. } | CheckoutError::StockConflict { .. } => StatusCode::CONFLICT,
        CheckoutError::ProductNotFound(_) |
        CheckoutError::OrderNotFound |
        CheckoutError::AuditNotFound(_) => StatusCode::NOT_FOUND,
        CheckoutError::SignatureMismatch => StatusCode::FORBIDDEN,
        CheckoutError::GatewayError(_) => StatusCode::BAD_GATEWAY,
        CheckoutError::Cart(e) => cart_status(e),
    }
}

fn lifecycle_status(e: &OrderLifecycleError) -> StatusCode {
    match e {
        OrderLifecycleError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        OrderLifecycleError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        OrderLifecycleError::InvalidTransition { .. } |
        OrderLifecycleError::CancellationNotAllowed(_) |
        OrderLifecycleError::RefundNotAllowed |
        OrderLifecycleError::InvalidRefundAmount => StatusCode::BAD_REQUEST,
        OrderLifecycleError::TransitionConflict { .. } | OrderLifecycleError::ExcessiveRefund { .. } => {
            StatusCode::CONFLICT
        },
    }
}

fn inventory_status(e: &InventoryError) -> StatusCode {
    match e {
        InventoryError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        InventoryError::ProductNotFound(_) => StatusCode::NOT_FOUND,
        InventoryError::StockUnderflow { .. } => StatusCode::CONFLICT,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn engine_errors_map_to_the_right_status() {
        let err = ServerError::from(CartError::InsufficientStock { requested: 4, available: 2 });
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        let err = ServerError::from(CheckoutError::SignatureMismatch);
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

        let err = ServerError::from(CheckoutError::GatewayError("timed out".into()));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);

        let err = ServerError::from(OrderLifecycleError::OrderNotFound(42));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        assert_eq!(ServerError::Unauthenticated.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn error_body_is_json() {
        let err = ServerError::from(CheckoutError::EmptyCart);
        let response = err.error_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
