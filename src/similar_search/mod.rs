//! Yandex similar-image flow: upload, session bootstrap, extraction and resolution

pub mod extractor;
pub mod resolver;
pub mod session;
pub mod types;
pub mod upload;

pub use extractor::{candidate_urls, extract_candidates, open_similar_listing};
pub use resolver::{LinkResolver, Resolve, best_resolution, parse_resolution_label};
pub use session::{BrowserSession, is_captcha_url};
pub use types::SearchRoot;
pub use upload::{load_source_image, upload_image};
