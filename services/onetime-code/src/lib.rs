pub mod config;
pub mod domain;
pub mod error;
pub mod infra;
pub mod reaper;
pub mod usecase;
