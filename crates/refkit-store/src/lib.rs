//! # refkit-store
//!
//! In-memory reference implementation of the refkit store read interface.
//!
//! The search pipeline treats the record store as an external black box
//! behind [`refkit_core::RecordStore`] and [`refkit_core::ContentSource`].
//! This crate provides a complete in-memory implementation of both, used
//! by the pipeline's tests and by embedders who have no external store.

pub mod fixtures;
pub mod memory;

pub use memory::MemoryRecordStore;
