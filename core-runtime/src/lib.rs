//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the offline cache engine:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! Every other core crate depends on this one for its logging conventions,
//! its injected capabilities (through [`config::CoreConfig`]), and the
//! [`events::EventBus`] it reports progress on.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, EventStream};
