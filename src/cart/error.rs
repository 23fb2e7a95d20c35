use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CartError {
    /// `in_cart` tells whether the product already had a line in the cart.
    #[error("{}", shortage_notice(*available, *in_cart))]
    NotEnoughStock { available: u32, in_cart: bool },
    #[error("Quantity must be at least 1.")]
    InvalidQuantity,
}

fn shortage_notice(available: u32, in_cart: bool) -> String {
    if in_cart {
        format!("Cannot add more than {available} items to the cart.")
    } else {
        format!("Only {available} items available.")
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CartStorageError {
    #[error("Cart storage I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for CartStorageError {
    fn from(e: std::io::Error) -> Self {
        CartStorageError::Io(e.to_string())
    }
}
