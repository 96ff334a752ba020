//! HTTP protocol layer module
//!
//! Response builders and date formatting, independent of how assets are found.

pub mod date;
pub mod response;

// Re-export commonly used types
pub use response::{
    build_404_response, build_405_response, build_asset_response, build_options_response,
    build_redirect_response, ResponseBody,
};
