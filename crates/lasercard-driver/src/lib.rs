//! Driver for laser-scanning controller cards.
//!
//! The crate turns toolpath layers into device command lists, runs them on
//! one or more cards and drives the auxiliary nLight laser board through the
//! card's digital outputs.
//!
//! # Architecture
//!
//! - [`sdk`]: the vendor SDK as an injected capability, plus error decoding
//! - [`card`] and [`devices`]: real and simulated card backends behind one trait
//! - [`session`]: one connected card with its laser settings and transform
//! - [`list`]: device-side scan lists and the layer-to-command builder
//! - [`execution`]: upload, execute, poll and cleanup of lists
//! - [`nlight`]: GPIO sequencing for the nLight driver board
//! - [`driver`]: the multi-card registry
//!
//! All I/O is blocking. A session runs at most one list at a time.

pub mod card;
pub mod clock;
pub mod command;
pub mod config;
pub mod devices;
pub mod driver;
pub mod execution;
pub mod list;
pub mod mock;
pub mod nlight;
pub mod sdk;
pub mod session;
pub mod toolpath;

pub use card::{RealCard, ScanCard, SimulatedCard};
pub use clock::{Clock, SystemClock};
pub use command::ScanCommand;
pub use config::{CardConfig, DriverConfig, TransformConfig};
pub use devices::AnyCard;
pub use driver::LaserCardDriver;
pub use execution::{ExecutionController, ExecutionState};
pub use list::ScanList;
pub use nlight::{NLightBoard, NLightPins};
pub use sdk::{NullSdk, RawResult, ScannerSdk, Sdk};
pub use session::CardSession;
pub use toolpath::{LayerData, SegmentData, SegmentProfile, ToolpathLayer};

pub use lasercard_core::{Error, Result};
