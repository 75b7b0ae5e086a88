pub mod types;
pub use types::*;
pub mod bank;
pub use bank::*;
pub mod registry;
pub use registry::*;

#[cfg(feature = "wav")]
pub mod loader;
