pub mod config;
pub mod error;
pub mod events;
pub mod identity;
pub mod scanner;
pub mod summary;
pub mod types;

pub use config::AppConfig;
pub use error::MonitorError;
pub use events::{parse_events, EventStream, LogEvent};
pub use identity::SessionIdentity;
pub use scanner::{ListOptions, LogFile, SessionListing, SessionStore};
pub use summary::{summarize_events, summarize_file, LogFileTimes, SessionAccumulator};
pub use types::{SessionStatus, SessionSummary};
