pub mod models;
pub mod senders;
pub mod service;

pub use models::{AlertEvent, AlertKind, AlertMessage, Severity};
pub use senders::SenderError;
pub use service::{NotificationService, Notifier};
