pub mod digest;
pub mod inbound;
pub mod schedule;
pub mod settings;
pub mod summary;

pub use settings::{ReportDay, SettingsError, TeamSettings};
