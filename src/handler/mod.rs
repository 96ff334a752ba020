//! Request handler module
//!
//! Maps requests onto the asset engine; the redirect listener has its own
//! handler in `server::redirect`.

pub mod router;

// Re-export main entry point
pub use router::handle_request;
