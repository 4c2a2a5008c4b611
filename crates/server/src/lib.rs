pub mod commands;
pub mod config;
pub mod error;
pub mod ingest;
pub mod registry;
pub mod rest;
