//! Adapter implementations for monitor ports.

mod builtin;
mod probe;

pub use builtin::{
    ARCHITECTURE_MONITOR, ArchitectureMonitor, CLOCK_DIFFERENCE_MONITOR, ClockMonitor,
    DEFAULT_DISK_SPACE_THRESHOLD, DISK_SPACE_MONITOR, DiskSpaceMonitor, RESPONSE_TIME_MONITOR,
    ResponseTimeMonitor, TEMPORARY_SPACE_MONITOR,
};
pub use probe::ChannelProbe;
