pub mod cli_config;
pub mod client;
pub mod compare;
pub mod environment;
pub mod manifest;
pub mod token;

pub use client::ArgoCdClient;
pub use environment::Environment;
