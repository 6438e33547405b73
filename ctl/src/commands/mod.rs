mod inspect;
mod license;

pub use inspect::*;
pub use license::*;
