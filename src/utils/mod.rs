pub mod constants;
pub mod url_utils;

pub use constants::*;
pub use url_utils::{filename_from_url, is_loopback_url, is_valid_url, similar_search_url};
