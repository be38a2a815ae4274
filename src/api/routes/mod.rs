pub mod health;
pub mod scans;
pub mod credits;
