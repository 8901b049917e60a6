// src/lib.rs
pub mod config;
pub mod utils;
pub mod pipelines;
pub mod cli;
pub mod report;
pub use cli::{Arguments, Technology};
