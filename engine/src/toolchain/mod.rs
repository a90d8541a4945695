//! Toolchain implementations
//!
//! The `Toolchain` trait lives in the sdk. This module provides the
//! subprocess-backed implementation configured from `[toolchain]`.

pub mod command;

pub use command::CommandToolchain;
pub use sdk::toolchain::Toolchain;
