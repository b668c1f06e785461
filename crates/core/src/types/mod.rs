//! Core types for Larkspur.

pub mod cart;
pub mod catalog;
pub mod money;

pub use cart::{CartItem, Customer};
pub use catalog::Catalog;
pub use money::to_minor_units;
