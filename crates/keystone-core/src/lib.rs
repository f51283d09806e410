//! Keystone Core
//!
//! This crate provides the small set of types shared by the Keystone storage
//! and index layers.
//!
//! # Overview
//!
//! - **Identifiers**: [`RowId`], the fixed-width row identifier stored in indexes
//! - **Encoding**: order-preserving byte encoding and the composite
//!   `encode(value) || encode(row_id)` index key
//! - **Errors**: [`CoreError`] for malformed encoded data
//!
//! # Example
//!
//! ```
//! use keystone_core::encoding::keys::{decode_index_key, encode_index_key};
//! use keystone_core::RowId;
//!
//! let key = encode_index_key(b"jack", RowId::new(1));
//! let (value, row_id) = decode_index_key(&key).unwrap();
//!
//! assert_eq!(value, b"jack");
//! assert_eq!(row_id, RowId::new(1));
//! ```
//!
//! # Modules
//!
//! - [`types`] - Core data types ([`RowId`])
//! - [`encoding`] - Order-preserving encodings and index key layout
//! - [`error`] - Error types ([`CoreError`])

// Deny unwrap in library code to ensure proper error handling
#![deny(clippy::unwrap_used)]

pub mod encoding;
pub mod error;
pub mod types;

pub use error::CoreError;
pub use types::RowId;
