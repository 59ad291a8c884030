// Services module - business logic layer

pub mod arr;
pub mod downloader;
pub mod matcher;
pub mod orchestrator;
pub mod updater;

// Catalog providers
pub mod justwatch;
