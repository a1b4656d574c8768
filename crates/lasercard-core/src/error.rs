//! Error types shared by every lasercard crate.
//!
//! Errors fall into five families: validation of names/sizes/ports at
//! construction time, type-mismatch and range failures on field access,
//! device errors reported by the vendor SDK, timing failures while a list is
//! executing, and registry/state errors. None of them is retried anywhere in
//! the workspace.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Field buffer validation errors
    #[error("Invalid API field name: {0}")]
    InvalidFieldName(String),

    #[error("Invalid API field data size: {0}")]
    InvalidFieldDataSize(usize),

    #[error("Invalid API variable name: {0}")]
    InvalidVariableName(String),

    #[error("Duplicate API variable name: {0}")]
    DuplicateVariableName(String),

    #[error("Invalid variable offset {offset} for {name}")]
    InvalidVariableOffset { name: String, offset: usize },

    #[error("Variable exceeds buffer: {name} at offset {offset}")]
    VariableExceedsBuffer { name: String, offset: usize },

    #[error("Invalid variable index: {0}")]
    InvalidVariableIndex(usize),

    #[error("Variable not found: {0}")]
    VariableNotFound(String),

    // Field buffer type and range errors
    #[error("Variable is not of type integer: {0}")]
    VariableIsNotOfTypeInteger(String),

    #[error("Variable is not of type double: {0}")]
    VariableIsNotOfTypeDouble(String),

    #[error("Variable is not of type bool: {0}")]
    VariableIsNotOfTypeBool(String),

    #[error("Variable is not of type enum: {0}")]
    VariableIsNotOfTypeEnum(String),

    #[error("Integer value out of {kind} range: {value}")]
    IntegerValueOutOfRange { kind: &'static str, value: i64 },

    #[error("Enum value out of {kind} range: {value}")]
    EnumValueOutOfRange { kind: &'static str, value: u32 },

    // Card validation errors
    #[error("Invalid card name")]
    InvalidCardName,

    #[error("Invalid card IP")]
    InvalidCardIp,

    #[error("Invalid card port: {0}")]
    InvalidCardPort(u32),

    #[error("Invalid maximum laser power: {0}W")]
    InvalidLaserPower(f64),

    // Registry and state errors
    #[error("Card already registered: {0}")]
    CardAlreadyRegistered(String),

    #[error("Card not registered: {0}")]
    CardNotRegistered(String),

    #[error("Scanner SDK has not been loaded")]
    SdkNotLoaded,

    #[error("Invalid list id: {0}")]
    InvalidListId(u32),

    #[error("A duplicate laser index was assigned: {laser_index} at cards {card} / {existing}")]
    AssignedDuplicateLaserIndex {
        laser_index: u32,
        card: String,
        existing: String,
    },

    #[error("No laser indices assigned")]
    NoLaserIndicesAssigned,

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    // Toolpath errors
    #[error("Segment {0} has no assigned card")]
    SegmentHasNoAssignedCard(u32),

    #[error("Invalid point count in segment {segment}: expected {expected}, got {actual}")]
    InvalidPointCount {
        segment: u32,
        expected: usize,
        actual: usize,
    },

    #[error("Toolpath error: {0}")]
    Toolpath(String),

    // Timing errors
    #[error("Invalid system timing: timer went back from {start_ms}ms to {current_ms}ms")]
    InvalidSystemTiming { start_ms: u64, current_ms: u64 },

    #[error("Scanning timeout after {0}ms")]
    ScanningTimeout(u64),

    // nLight driver board errors
    #[error("Invalid nLight laser mode: {0}")]
    InvalidNLightLaserMode(u32),

    // Device errors
    #[error("Device error {status} ({message})")]
    Device { status: i32, message: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a device error from a raw SDK status and the decoded vendor message.
    pub fn device(status: i32, message: impl Into<String>) -> Self {
        Self::Device {
            status,
            message: message.into(),
        }
    }

    /// Create a point count mismatch error.
    pub fn invalid_point_count(segment: u32, expected: usize, actual: usize) -> Self {
        Self::InvalidPointCount {
            segment,
            expected,
            actual,
        }
    }

    /// Create a toolpath accessor error.
    pub fn toolpath(message: impl Into<String>) -> Self {
        Self::Toolpath(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether this error was reported by the card itself.
    pub fn is_device_error(&self) -> bool {
        matches!(self, Self::Device { .. })
    }

    /// Whether this error is one of the fatal timing conditions of a running list.
    pub fn is_timing_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidSystemTiming { .. } | Self::ScanningTimeout(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
