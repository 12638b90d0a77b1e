pub mod batch;
pub mod concat;
pub mod config;
pub mod convert;
pub mod error;
pub mod io;
pub mod model;
pub mod pipeline;
pub mod stack;

pub use error::{MergeError, Result};
