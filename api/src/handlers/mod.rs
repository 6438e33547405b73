pub mod devices;
pub mod discovery;
pub mod health;
pub mod license;
