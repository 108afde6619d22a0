pub mod bucket;
pub mod dashboard;
pub mod transaction;
