pub mod activation;
pub mod audit;
pub mod license;

pub use activation::*;
pub use audit::*;
pub use license::*;

use chrono::{DateTime, NaiveDateTime, Utc};

/// SQLite stores timestamps without an offset; everything we write is UTC.
pub(crate) fn utc(value: NaiveDateTime) -> DateTime<Utc> {
    value.and_utc()
}
