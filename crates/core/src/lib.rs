//! Core library: download watching, stability probing, and client assignment.

pub mod classifier;
pub mod config;
pub mod coordinator;
pub mod gateway;
pub mod models;
pub mod oracle;
pub mod watcher;
