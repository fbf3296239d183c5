pub mod api;
pub mod db;
pub mod indexer;
pub mod near;
pub mod scheduler;
pub mod scoring;
pub mod settings;
pub mod views;
