pub mod analyzer;
pub mod api;
pub mod audit;
pub mod cache;
pub mod cli;
pub mod config;
pub mod db;
pub mod engine;
pub mod errors;
pub mod ledger;
pub mod models;
