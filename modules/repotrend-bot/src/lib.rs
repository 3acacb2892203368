pub mod discovery;
pub mod fanout;
pub mod format;
pub mod groups;
pub mod ledger;
pub mod scheduler;
pub mod traits;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use fanout::{BroadcastReport, Broadcaster};
pub use ledger::PostedLedger;
pub use scheduler::PostScheduler;
