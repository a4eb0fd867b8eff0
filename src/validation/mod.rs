use std::fmt;

pub const MAX_NOTES_LEN: usize = 2000;
pub const MAX_COLOR_LEN: usize = 50;
pub const MAX_ADDRESS_LEN: usize = 1000;
pub const MAX_SEARCH_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), ValidationError>;

pub fn sanitize_string(value: &str) -> String {
    value
        .chars()
        .map(|ch| if ch.is_control() { ' ' } else { ch })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Sanitizes an optional free-text field, mapping blank input to `None`.
pub fn sanitize_optional(value: Option<&str>) -> Option<String> {
    value.map(sanitize_string).filter(|v| !v.is_empty())
}

pub fn validate_required(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }

    Ok(())
}

pub fn validate_min_len(field: &'static str, value: &str, min_len: usize) -> ValidationResult {
    if value.chars().count() < min_len {
        return Err(ValidationError::new(
            field,
            format!("must be at least {} characters", min_len),
        ));
    }

    Ok(())
}

pub fn validate_max_len(field: &'static str, value: &str, max_len: usize) -> ValidationResult {
    if value.chars().count() > max_len {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", max_len),
        ));
    }

    Ok(())
}

pub fn validate_quantity(quantity: i32) -> ValidationResult {
    if quantity < 1 {
        return Err(ValidationError::new("quantity", "must be at least 1"));
    }

    Ok(())
}

pub fn validate_range(field: &'static str, value: u32, min: u32, max: u32) -> ValidationResult {
    if value < min || value > max {
        return Err(ValidationError::new(
            field,
            format!("must be between {} and {}", min, max),
        ));
    }

    Ok(())
}

/// Sanitizes and checks a delivery address, returning the stored form.
pub fn validate_delivery_address(value: &str, min_len: usize) -> Result<String, ValidationError> {
    let address = sanitize_string(value);
    validate_required("delivery_address", &address)?;
    validate_min_len("delivery_address", &address, min_len)?;
    validate_max_len("delivery_address", &address, MAX_ADDRESS_LEN)?;
    Ok(address)
}
