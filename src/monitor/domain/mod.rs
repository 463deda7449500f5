//! Domain model for monitor descriptors, results, and reports.

mod descriptor;
mod error;
mod report;
mod result;

pub use descriptor::{
    DEFAULT_ASYNC_TIMEOUT, ExecutionMode, MAX_MONITOR_NAME_LENGTH, MonitorDescriptor, MonitorName,
};
pub use error::MonitorDomainError;
pub use report::{MonitorCell, MonitorReport};
pub use result::{MonitorFailure, MonitorResult, MonitorValue};
