//! Larkspur Core - Shared types library.
//!
//! This crate provides the common domain types used by the Larkspur backend:
//! the checkout payloads (cart items, customer), the cached catalog snapshot,
//! and money conversion to integer minor units.
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. This keeps it
//! lightweight and allows it to be used anywhere.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
