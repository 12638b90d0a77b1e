//! Core library for the sheaf-tools command line application.
//!
//! The library holds two independent merge engines and the helpers that drive
//! them from files. Sheet stacking lives in [`sheaf::tools::stack`], page
//! concatenation in [`sheaf::tools::concat`], format adapters under
//! [`sheaf::tools::io`], word-processor conversion in
//! [`sheaf::tools::convert`], the directory-scanning variant in
//! [`sheaf::tools::batch`], and file-level orchestration in
//! [`sheaf::tools::pipeline`]. Both engines share the options defined in
//! [`sheaf::tools::config`].

pub mod sheaf;

pub use sheaf::tools::{
    MergeError, Result, batch, concat, config, convert, error, io, model, pipeline, stack,
};
