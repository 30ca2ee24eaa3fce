pub mod compare;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fingerprint;
pub mod model;
pub mod report;
pub mod snapshot;
pub mod sqltext;
pub mod storage;
pub mod tables;
pub mod validate;
pub mod value;
