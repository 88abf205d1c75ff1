//! # Firestore Provider
//!
//! Implements `RemoteCatalog` over the Cloud Firestore REST API (v1).
//!
//! ## Overview
//!
//! This module provides:
//! - Paginated collection listing (`documents:list` with `pageToken`)
//! - Single document lookup
//! - Decoding of Firestore typed values into plain JSON
//! - Exponential backoff on rate limiting and server errors

pub mod connector;
pub mod error;
pub mod types;

pub use connector::{FirestoreCatalog, FirestoreConfig};
pub use error::{FirestoreError, Result};
