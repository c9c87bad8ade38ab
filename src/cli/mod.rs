//! Command line interface for operating the bridge by hand.

pub mod args;

pub use args::{Args, Command};
