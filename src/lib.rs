pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod loader;
pub mod logging;
pub mod pipeline;
pub mod storage;
pub mod table;
pub mod transform;
