pub mod config;
pub mod error;
pub mod http;
pub mod oauth;
pub mod service;
pub mod storage;
pub mod telemetry;
pub mod tokens;
