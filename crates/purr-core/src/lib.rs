//! Purr Core - Fundamental types and primitives
//!
//! This crate defines the types shared by every stage of the control loop:
//! - Control configuration and its validation
//! - Parameter ranges and the parameter set written to the audio device
//! - Error types

pub mod config;
pub mod error;
pub mod params;

pub use config::*;
pub use error::*;
pub use params::*;
