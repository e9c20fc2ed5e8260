pub mod classifier;
pub mod config;
pub mod coordinate;
pub mod engine;
pub mod error;
pub mod fixtures;
pub mod generator;
pub mod identifier;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod output;
pub mod protocol;
pub mod rng;
pub mod scenario;
pub mod transport;
