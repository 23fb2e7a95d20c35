use thiserror::Error;

use crate::error::OrderError;
use crate::store::StoreError;

/// Why an order could not be placed. `Display` is the message shown to the customer.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CheckoutError {
    #[error("Your cart is empty.")]
    EmptyCart,
    #[error("Invalid shipping details: {0}")]
    Validation(String),
    #[error("Product {0} is no longer available.")]
    ProductUnavailable(String),
    #[error("Not enough stock for {name}. Only {available} available.")]
    InsufficientStock { name: String, available: u32 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<OrderError> for CheckoutError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::Store(e) => CheckoutError::Store(e),
            OrderError::NotFound(id) | OrderError::Forbidden(id) => {
                CheckoutError::Store(StoreError::NotFound(id))
            }
        }
    }
}
