pub mod bundle;
pub mod config;
pub mod error;
pub mod link;
pub mod logging;
pub mod registry;

pub use error::Error;
