//! Common test utilities for field buffer integration tests.

#![allow(dead_code)]

use lasercard_schema::{TypedFieldBuffer, VariableType};

/// Size of the buffer built by [`create_all_types_field`].
pub const ALL_TYPES_FIELD_SIZE: usize = 64;

/// Variables of [`create_all_types_field`], one per kind, in registration order.
pub const ALL_TYPES_VARIABLES: &[(&str, usize, VariableType)] = &[
    ("flag", 0, VariableType::Bool),
    ("u8var", 1, VariableType::Uint8),
    ("u16var", 2, VariableType::Uint16),
    ("u32var", 4, VariableType::Uint32),
    ("u64var", 8, VariableType::Uint64),
    ("i8var", 16, VariableType::Int8),
    ("i16var", 18, VariableType::Int16),
    ("i32var", 20, VariableType::Int32),
    ("i64var", 24, VariableType::Int64),
    ("f32var", 32, VariableType::Float),
    ("f64var", 40, VariableType::Double),
    ("e8var", 48, VariableType::Enum8),
    ("e16var", 50, VariableType::Enum16),
    ("e32var", 52, VariableType::Enum32),
];

/// Build a field containing one variable of every kind.
pub fn create_all_types_field() -> TypedFieldBuffer {
    TypedFieldBuffer::builder("rlAllTypes", 1, ALL_TYPES_FIELD_SIZE)
        .expect("valid field")
        .register_variables(ALL_TYPES_VARIABLES)
        .expect("valid schema")
        .build()
}

/// Every variable kind, for strategies and table tests.
pub const ALL_VARIABLE_TYPES: [VariableType; 14] = [
    VariableType::Bool,
    VariableType::Uint8,
    VariableType::Uint16,
    VariableType::Uint32,
    VariableType::Uint64,
    VariableType::Int8,
    VariableType::Int16,
    VariableType::Int32,
    VariableType::Int64,
    VariableType::Float,
    VariableType::Double,
    VariableType::Enum8,
    VariableType::Enum16,
    VariableType::Enum32,
];

/// Assert that every byte outside `range` is still zero.
pub fn assert_zero_outside(field: &TypedFieldBuffer, range: std::ops::Range<usize>) {
    for (index, byte) in field.data().iter().enumerate() {
        if !range.contains(&index) {
            assert_eq!(*byte, 0, "byte {} was modified", index);
        }
    }
}
