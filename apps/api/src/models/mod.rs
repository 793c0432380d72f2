pub mod application;
pub mod catalog;
pub mod profile;
pub mod user;
