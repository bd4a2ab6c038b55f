pub mod artifacts;
pub mod config;
pub mod encoders;
pub mod explain;
pub mod features;
pub mod heuristic;
pub mod model;
pub mod predictor;
pub mod schema;
pub mod util;
