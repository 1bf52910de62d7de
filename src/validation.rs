//! Pre-flight checks for user input
//!
//! Input that fails here never reaches the network.

pub const MIN_NAME_LEN: usize = 5;
pub const MIN_NOTE_LEN: usize = 10;
pub const MAX_NOTE_LEN: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Name cannot be empty.")]
    EmptyName,
    #[error("Name must be at least 5 characters long.")]
    NameTooShort,
    #[error("Note content cannot be empty.")]
    EmptyNote,
    #[error("Note content must be at least 10 characters long.")]
    NoteTooShort,
    #[error("Note content must be at most 500 characters long.")]
    NoteTooLong,
}

/// Check a new display name
///
/// # Errors
///
/// Returns an error if the name is blank or shorter than [`MIN_NAME_LEN`].
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if name.chars().count() < MIN_NAME_LEN {
        return Err(ValidationError::NameTooShort);
    }
    Ok(())
}

/// Check note content
///
/// # Errors
///
/// Returns an error if the content is blank, shorter than [`MIN_NOTE_LEN`]
/// or longer than [`MAX_NOTE_LEN`].
pub fn validate_note(content: &str) -> Result<(), ValidationError> {
    if content.trim().is_empty() {
        return Err(ValidationError::EmptyNote);
    }
    match content.chars().count() {
        n if n < MIN_NOTE_LEN => Err(ValidationError::NoteTooShort),
        n if n > MAX_NOTE_LEN => Err(ValidationError::NoteTooLong),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_rules() {
        assert_eq!(validate_name("   "), Err(ValidationError::EmptyName));
        assert_eq!(validate_name(""), Err(ValidationError::EmptyName));
        assert_eq!(validate_name("Ana"), Err(ValidationError::NameTooShort));
        assert_eq!(validate_name("Alice"), Ok(()));
    }

    #[test]
    fn test_note_rules() {
        assert_eq!(validate_note("\n\t "), Err(ValidationError::EmptyNote));
        assert_eq!(validate_note("too short"), Err(ValidationError::NoteTooShort));
        assert_eq!(validate_note("long enough note"), Ok(()));
        assert_eq!(
            validate_note(&"x".repeat(MAX_NOTE_LEN + 1)),
            Err(ValidationError::NoteTooLong)
        );
        assert_eq!(validate_note(&"x".repeat(MAX_NOTE_LEN)), Ok(()));
    }

    #[test]
    fn test_messages_are_user_facing() {
        assert_eq!(
            ValidationError::NameTooShort.to_string(),
            "Name must be at least 5 characters long."
        );
        assert_eq!(
            ValidationError::EmptyNote.to_string(),
            "Note content cannot be empty."
        );
    }
}
