//! nexhist-io: HDF5/NeXus event-data access.
//!
//! This crate reads ORNL-style `NXevent_data` groups: bank discovery
//! under `NXentry`, hyperslab event reads, time-filter derivation from
//! per-pulse `event_index` arrays, and TOF unit handling.
//!

mod error;
mod file;
mod loader;
mod units;

pub use error::{Error, Result};
pub use file::{NexusFile, EVENT_ID, EVENT_INDEX, EVENT_TIME_OFFSET};
pub use loader::NexusLoader;
pub use units::tof_unit_conversion;
