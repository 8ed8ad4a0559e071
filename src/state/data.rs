//! Shared data structures for the application state
//!
//! These structs mirror the JSON the remote catalog returns. They are
//! never mutated locally.

use serde::Deserialize;

/// One entry of a catalog page
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImageSummary {
    /// Remote image id (e.g., "237")
    pub id: String,
    /// Photographer name
    pub author: String,
    /// Full-size download URL of the original image
    pub download_url: String,
}

/// Metadata for a single image, as returned by the detail endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImageDetail {
    pub id: String,
    pub author: String,
    /// Original width in pixels
    #[serde(default)]
    pub width: u32,
    /// Original height in pixels
    #[serde(default)]
    pub height: u32,
    /// Source page of the photo on the provider's site
    #[serde(default)]
    pub url: String,
    pub download_url: String,
}
