pub mod controller;
pub mod session;
pub mod state;

pub use controller::UsageTracker;
pub use session::Session;
pub use state::{TrackerSnapshot, TrackerState, TrackingStatus};
