//! Object storage backends.
//!
//! The [`backend::StorageBackend`] trait abstracts over where objects are
//! read from.  [`aws::S3Backend`] talks to a real bucket; the in-memory
//! [`memory::MemoryBackend`] stands in for it in tests.

pub mod aws;
pub mod backend;
pub mod memory;
