//! Platform abstraction traits

pub mod can;
pub mod flash;

pub use can::CanTransport;
pub use flash::FlashInterface;
