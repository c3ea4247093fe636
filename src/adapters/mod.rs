//! Adapters implementing domain ports.
//!
//! Infrastructure implementations of the traits defined in the ports module.

pub mod in_memory_repository;
pub mod msgpack_repository;

pub use in_memory_repository::InMemoryCheckpointRepository;
pub use msgpack_repository::{MSGPACK_EXTENSION, MsgPackCheckpointRepository, with_msgpack_extension};
