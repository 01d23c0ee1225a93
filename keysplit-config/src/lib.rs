//! Configuration types and loading for keysplit.
//!
//! [`shared::SplitterConfig`] describes how an input file is read and how output targets are
//! written. [`load_config`] layers an optional configuration file and `KEYSPLIT_`-prefixed
//! environment variables on top of the serde defaults.

mod load;
pub mod shared;

pub use load::{LoadConfigError, load_config};
