//! Order placement.

mod error;
mod order_id;
mod service;

pub use error::*;
pub use order_id::*;
pub use service::*;
