//! Shared input validation — framework-agnostic pure functions.
//!
//! Route handlers stay thin adapters; everything reusable about checking
//! request fields lives here.

/// Validation failure with a client-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ValidationError {}

/// Validate and normalize a team name. Returns the trimmed name.
pub fn validate_team_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim().to_string();
    if trimmed.is_empty() || trimmed.len() > 64 {
        return Err(ValidationError("team name must be 1-64 characters".into()));
    }
    Ok(trimmed)
}

/// Validate and normalize an email address. Returns the lowercased, trimmed
/// email.
pub fn validate_email(email: &str) -> Result<String, ValidationError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') || email.len() > 254 {
        return Err(ValidationError(format!("invalid email address: {email}")));
    }
    Ok(email)
}

/// Validate a non-empty list of email addresses, normalizing each.
pub fn validate_emails(emails: &[String]) -> Result<Vec<String>, ValidationError> {
    if emails.is_empty() {
        return Err(ValidationError("at least one email is required".into()));
    }
    emails.iter().map(|e| validate_email(e)).collect()
}
