//! Application tracking for colleges and scholarships.

pub mod handlers;
pub mod status;
pub mod store;
