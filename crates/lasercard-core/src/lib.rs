pub mod constants;
pub mod error;
pub mod transform;
pub mod types;

pub use error::{Error, Result};
pub use transform::CoordinateTransform;
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
