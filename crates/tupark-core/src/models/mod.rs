pub mod activity_log;
pub mod problem_report;
pub mod slot;
pub mod user;
