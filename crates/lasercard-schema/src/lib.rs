//! Typed field buffers for exchanging fixed-layout configuration records
//! with the scanner SDK.

pub mod field;
pub mod schemas;
pub mod validation;
pub mod variable;

pub use field::{FieldSchemaBuilder, TypedFieldBuffer};
pub use schemas::{LaserConfig, SpiConfig};
pub use validation::{check_name, validate_data_size};
pub use variable::{VariableDescriptor, VariableType};
