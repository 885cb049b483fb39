pub mod config;
pub mod detect;
pub mod error;
pub mod io;
pub mod learning;
pub mod paths;
pub mod store;
pub mod types;
pub mod vision;

pub use error::{LearnError, Result};
