pub mod engine;
pub mod service;
pub mod snapshot;

pub use engine::{TickError, TickSummary};
pub use service::{LoopTransition, MonitorService, MonitoringStatus};
pub use snapshot::{ContainerSnapshot, SnapshotStore};
