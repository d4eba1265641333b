//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest display name accepted, in characters.
pub const MAX_DISPLAY_NAME_LENGTH: usize = 32;

/// Validates that a display name has visible characters and is not too long.
///
/// ```ignore
/// validate_display_name("Alice") // Ok
/// validate_display_name("   ")   // Err - blank
/// ```
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("display_name_blank");
        err.message = Some("Display name cannot be blank".into());
        return Err(err);
    }

    let length = trimmed.chars().count();
    if length > MAX_DISPLAY_NAME_LENGTH {
        let mut err = ValidationError::new("display_name_length");
        err.message = Some(
            format!(
                "Display name must be at most {MAX_DISPLAY_NAME_LENGTH} characters (got {length})"
            )
            .into(),
        );
        return Err(err);
    }

    Ok(())
}

/// Validates that an identifier sent by a client is not blank.
pub fn validate_identifier(id: &str) -> Result<(), ValidationError> {
    if id.trim().is_empty() {
        let mut err = ValidationError::new("identifier_blank");
        err.message = Some("Identifier cannot be blank".into());
        return Err(err);
    }
    Ok(())
}
