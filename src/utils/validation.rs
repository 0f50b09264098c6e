use crate::utils::error::{AppError, AppResult};

pub const MAX_MESSAGE_LEN: usize = 4000;

/// Returns the trimmed id, rejecting missing or blank values.
pub fn require_id<'a>(field: &str, value: Option<&'a str>) -> AppResult<&'a str> {
    match value.map(str::trim) {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(AppError::Validation(format!("{} is required", field))),
    }
}

/// Returns the trimmed message body.
pub fn validate_message_content(content: &str) -> AppResult<&str> {
    let content = content.trim();

    if content.is_empty() {
        return Err(AppError::Validation(
            "Message content cannot be empty".to_string(),
        ));
    }

    if content.chars().count() > MAX_MESSAGE_LEN {
        return Err(AppError::Validation(format!(
            "Message content must be at most {} characters long",
            MAX_MESSAGE_LEN
        )));
    }

    Ok(content)
}
