pub mod browse;
pub mod bucket;
pub mod dashboard;
pub mod import;
pub mod period;
pub mod report;
pub mod transaction;
pub mod tui;
pub mod validation;
