//! Selectors and data structures for the Yandex similar-image flow

use image::DynamicImage;

// =============================================================================
// Selectors
// =============================================================================

/// "Similar images" tab on the search-by-image result page
pub const SIMILAR_IMAGES_TAB_SELECTOR: &str = concat!(
    r#"[id^="CbirNavigation-"] > nav > div > div > div > div > "#,
    "a.CbirNavigation-TabsItem.CbirNavigation-TabsItem_name_similar-page"
);

/// Every anchor on the similar-images listing; filtered down to internal search links
pub const CANDIDATE_LINK_SELECTOR: &str = "div a";

/// "Open" button that expands into a list of sizes when several are offered
pub const RESOLUTION_DROPDOWN_SELECTOR: &str = concat!(
    "body > div.Modal.Modal_visible.Modal_theme_normal.ImagesViewer-Modal.ImagesViewer > ",
    "div.Modal-Wrapper > div > div > div > div.ImagesViewer-Layout.ImagesViewer-Container > ",
    "div > div.ImagesViewer-TopSide > div.ImagesViewer-LayoutSideblock > div > div > div > ",
    "div.MMViewerButtons > ",
    "div.OpenImageButton.OpenImageButton_text.OpenImageButton_sizes.MMViewerButtons-OpenImageSizes > button"
);

/// Size options inside the expanded dropdown; label is `W×H`
pub const RESOLUTION_OPTION_SELECTOR: &str = concat!(
    "body > div.Modal.Modal_visible.Modal_theme_normal.ImagesViewer-Modal.ImagesViewer > ",
    "div.Modal-Wrapper > div > div > div > div.ImagesViewer-Layout.ImagesViewer-Container > ",
    "div > div.ImagesViewer-TopSide > div.ImagesViewer-LayoutSideblock > div > div > div > ",
    "div.MMViewerButtons > ",
    "div.OpenImageButton.OpenImageButton_text.OpenImageButton_sizes.MMViewerButtons-OpenImageSizes > div > ul li a"
);

/// Single "open original" link shown when only one size exists
pub const OPEN_BUTTON_SELECTOR: &str = concat!(
    "body > div.Modal.Modal_visible.Modal_theme_normal.ImagesViewer-Modal.ImagesViewer > ",
    "div.Modal-Wrapper > div > div > div > div.ImagesViewer-Layout.ImagesViewer-Container > ",
    "div > div.ImagesViewer-TopSide > div.ImagesViewer-LayoutSideblock > div > div > div > ",
    "div.MMViewerButtons > ",
    "div.OpenImageButton.OpenImageButton_text.MMViewerButtons-OpenImageSizes > a"
);

/// Markers of the provider's bot check
pub const CAPTCHA_MARKERS: &[&str] = &["showcaptcha", "/captcha", "smartcaptcha"];

// =============================================================================
// Data Structures
// =============================================================================

/// Result of uploading the source image
#[derive(Debug, Clone)]
pub struct SearchRoot {
    /// Absolute search-by-image URL for the uploaded picture
    pub search_url: String,
    /// Decoded source image, used as the first dedup reference
    pub query_image: DynamicImage,
}
