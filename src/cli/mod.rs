pub mod commands;
pub mod serve;
pub mod scan;
pub mod query;
pub mod credits;

pub use commands::{Cli, Commands};
