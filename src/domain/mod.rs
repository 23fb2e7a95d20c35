pub mod category;
pub mod order;
pub mod product;
pub mod user;

pub use category::*;
pub use order::*;
pub use product::*;
pub use user::*;

use chrono::{DateTime, SubsecRound, Utc};

/// Current time truncated to the millisecond precision documents are stored with.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}
