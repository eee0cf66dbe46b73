//! Storage abstraction and implementations for CHRONOS.
//!
//! This crate provides trait-based storage interfaces with a JSON file
//! reference implementation and an in-memory implementation.

#![warn(missing_docs)]

pub mod trait_;
pub mod json_storage;
pub mod memory;

pub use trait_::{AggregateStorage, Storage, StorageError, Result};
pub use json_storage::{JsonAggregateStorage, JsonStorage};
pub use memory::MemoryStorage;
