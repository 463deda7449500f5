//! Monitor catalog, dispatch, and periodic scheduling.

mod cancellation;
mod catalog;
mod dispatcher;
mod scheduler;

pub use cancellation::{DispatchCancellation, DispatchCanceller};
pub use catalog::{MonitorCatalog, StandardMonitorConfig};
pub use dispatcher::{
    CANCELLED_REASON, DEFAULT_MAX_CONCURRENT_UNITS, DispatchError, DispatchResult,
    MonitorDispatcher,
};
pub use scheduler::{MonitorScheduler, MonitorSchedulerHandle};
