//! Derived resource addresses for edited images
//!
//! The remote service serves transformed variants at
//! `{id}/{width}/{height}` with optional `blur=<n>` and `grayscale`
//! query components. Only parameters that deviate from their neutral
//! value are appended, always blur first.

use super::edit::EditParams;

/// Query flag the remote service recognises for greyscale output
const GREYSCALE_FLAG: &str = "grayscale";

/// Build the resource path for an image with the given parameters.
///
/// Pure and infallible: validating the numbers is the caller's job.
pub fn build_edit_path(image_id: &str, params: &EditParams) -> String {
    let mut path = format!("{}/{}/{}", image_id, params.width, params.height);
    let mut separator = '?';

    if params.blur > 0 {
        path.push(separator);
        path.push_str(&format!("blur={}", params.blur));
        separator = '&';
    }
    if params.greyscale {
        path.push(separator);
        path.push_str(GREYSCALE_FLAG);
    }

    path
}

/// Build the absolute URL of the transformed resource under `base_url`
pub fn edit_resource_url(base_url: &str, image_id: &str, params: &EditParams) -> String {
    format!(
        "{}/id/{}",
        base_url.trim_end_matches('/'),
        build_edit_path(image_id, params)
    )
}
