//! HTTP handlers.
//!
//! Handlers take the shared [`crate::AppState`] plus already-extracted
//! request values; extraction and routing live in [`crate::server`].

pub mod content;
pub mod health;
