pub mod engagement;
pub mod http;

pub mod mock;

pub use engagement::HttpEngagementTracker;
pub use http::{ClientConfig, HttpAuditClient};
