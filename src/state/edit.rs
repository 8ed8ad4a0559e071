//! Transformation parameters for a catalog image
//!
//! The remote service derives variants of an image by resizing, blurring
//! and desaturating it. These parameters are what the user edits and what
//! gets persisted per image.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest blur level the remote service accepts
pub const MAX_BLUR: u8 = 10;

/// Errors raised when parameters are checked at the save boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("width and height must be greater than zero")]
    ZeroDimension,
    #[error("blur must be between 0 and 10, got {0}")]
    BlurOutOfRange(u8),
    #[error("{field} must be a whole number, got {value:?}")]
    InvalidNumber { field: &'static str, value: String },
}

/// All transformation parameters for one image
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditParams {
    /// Output width in pixels
    pub width: u32,

    /// Output height in pixels
    pub height: u32,

    /// Blur level (0 to 10)
    /// - 0 = no blur, nothing appended to the URL
    pub blur: u8,

    /// Greyscale conversion
    pub greyscale: bool,
}

impl Default for EditParams {
    /// Create default edit parameters (50x50, no blur, colour)
    fn default() -> Self {
        Self {
            width: 50,
            height: 50,
            blur: 0,
            greyscale: false,
        }
    }
}

impl EditParams {
    /// Check if this represents an unedited image (all values at default)
    pub fn is_unedited(&self) -> bool {
        *self == Self::default()
    }

    /// Check the parameters against what the remote service accepts.
    ///
    /// The URL builder itself never fails, so this runs before a session is saved.
    pub fn validate(&self) -> Result<(), EditError> {
        if self.width == 0 || self.height == 0 {
            return Err(EditError::ZeroDimension);
        }
        if self.blur > MAX_BLUR {
            return Err(EditError::BlurOutOfRange(self.blur));
        }
        Ok(())
    }
}

/// Parse a dimension typed into a text field
pub fn parse_dimension(field: &'static str, value: &str) -> Result<u32, EditError> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| EditError::InvalidNumber {
            field,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unedited() {
        let params = EditParams::default();
        assert!(params.is_unedited());
        assert_eq!(params.width, 50);
        assert_eq!(params.height, 50);
        assert_eq!(params.blur, 0);
        assert!(!params.greyscale);
    }

    #[test]
    fn test_serialization() {
        let mut params = EditParams::default();
        params.width = 200;
        params.blur = 5;
        params.greyscale = true;

        let json = serde_json::to_string(&params).unwrap();
        let restored: EditParams = serde_json::from_str(&json).unwrap();

        assert_eq!(params, restored);
        assert!(!restored.is_unedited());
    }

    #[test]
    fn test_any_change_counts_as_edited() {
        let params = EditParams {
            greyscale: true,
            ..EditParams::default()
        };
        assert!(!params.is_unedited());
    }

    #[test]
    fn test_validate_rejects_zero_dimensions() {
        let params = EditParams {
            width: 0,
            ..EditParams::default()
        };
        assert_eq!(params.validate(), Err(EditError::ZeroDimension));

        let params = EditParams {
            height: 0,
            ..EditParams::default()
        };
        assert_eq!(params.validate(), Err(EditError::ZeroDimension));
    }

    #[test]
    fn test_validate_blur_bounds() {
        let at_max = EditParams {
            blur: MAX_BLUR,
            ..EditParams::default()
        };
        assert!(at_max.validate().is_ok());

        let over = EditParams {
            blur: 11,
            ..EditParams::default()
        };
        assert_eq!(over.validate(), Err(EditError::BlurOutOfRange(11)));
    }

    #[test]
    fn test_parse_dimension() {
        assert_eq!(parse_dimension("width", " 320 "), Ok(320));
        assert!(matches!(
            parse_dimension("height", "12px"),
            Err(EditError::InvalidNumber { field: "height", .. })
        ));
        assert!(parse_dimension("width", "-4").is_err());
    }
}
