pub mod applications;
pub mod catalog;
pub mod config;
pub mod db;
pub mod errors;
pub mod ingest;
pub mod llm_client;
pub mod models;
pub mod profile;
pub mod routes;
pub mod state;
pub mod users;

pub use routes::build_router;
pub use state::AppState;
