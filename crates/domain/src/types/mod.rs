//! Common data types used throughout the forwarder

pub mod batch;
pub mod page;
pub mod record;
pub mod run;
pub mod window;

pub use batch::Batch;
pub use page::{AuditPage, PageRequest};
pub use record::{AuditRecord, IdentifiedRecord, KEY_FIELDS};
pub use run::{DeliveryOutcome, DeliveryStatus, RunResult};
pub use window::TimeWindow;
