//! Application layer - Use cases and orchestration.
//!
//! Services here depend on domain ports (traits) rather than concrete
//! embedding providers, chunkers or indexes.

pub mod services;

pub use services::{ChunkedVectorStore, StoreConfig};
