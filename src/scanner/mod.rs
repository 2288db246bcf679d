mod controller;
mod payload;
mod schedule;

pub use controller::{ScanLoopController, ScanLoopState, ScanOutcome};
pub use payload::{ScanPayload, PAYLOAD_DELIMITER};
pub use schedule::ScanSchedule;
