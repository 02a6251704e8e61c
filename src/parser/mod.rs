pub mod errors;
pub mod models;
pub mod stream_selector;
pub mod url_parser;
pub mod utils;

pub use url_parser::{UriNormalizer, is_uri_in_valid_format};
