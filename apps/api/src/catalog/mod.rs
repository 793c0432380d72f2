//! Read-only institution and scholarship catalog.

pub mod handlers;
