//! Lambda entrypoint and request dispatch

pub mod event_handler;
pub mod handler;
pub mod helpers;
pub mod state;

// Re-export the main handler for convenience
pub use handler::function_handler;
pub use state::AppState;
