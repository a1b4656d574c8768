//! Concrete vendor configuration records.
//!
//! Each schema wraps a [`TypedFieldBuffer`](crate::TypedFieldBuffer) whose
//! variables mirror one versioned C structure of the scanner SDK.

mod laser_config;
mod spi_config;

pub use laser_config::LaserConfig;
pub use spi_config::{SPI_MODULE_COUNT, SpiConfig};
