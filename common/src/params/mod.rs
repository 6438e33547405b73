//! Input parameters for the various functions within slotd.

mod device;
pub use device::*;
