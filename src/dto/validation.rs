//! Validation helpers for DTOs.

use validator::ValidationError;

const LOGO_PREFIX: &str = "data:image/";

/// Validates that a team logo is an inline image data URL.
///
/// # Examples
///
/// ```ignore
/// validate_logo("data:image/png;base64,iVBORw0KGgo=") // Ok
/// validate_logo("https://example.com/logo.png")       // Err - not inline
/// validate_logo("data:text/plain,hello")              // Err - not an image
/// ```
pub fn validate_logo(logo: &str) -> Result<(), ValidationError> {
    if !logo.starts_with(LOGO_PREFIX) {
        let mut err = ValidationError::new("logo_scheme");
        err.message = Some("Logo must be a data:image/... URL".into());
        return Err(err);
    }

    match logo.split_once(',') {
        Some((_, payload)) if !payload.is_empty() => Ok(()),
        _ => {
            let mut err = ValidationError::new("logo_payload");
            err.message = Some("Logo data URL has no payload".into());
            Err(err)
        }
    }
}
