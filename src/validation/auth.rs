use crate::error::{AppError, FieldError, Result};

/// Validates an email address shape. Deliberately loose: one `@` with
/// non-empty local and domain parts, and a dot in the domain.
pub fn validate_email(email: &str) -> Result<()> {
    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();

    if local.is_empty() || domain.is_empty() || !domain.contains('.') || email.len() > 255 {
        return Err(AppError::Validation(vec![FieldError::new(
            "email",
            "Email is not a valid address",
        )]));
    }

    Ok(())
}

/// Validates a password against length bounds.
pub fn validate_password(password: &str) -> Result<()> {
    if password.len() < 8 {
        return Err(AppError::Validation(vec![FieldError::new(
            "password",
            "Password must be at least 8 characters long",
        )]));
    }

    if password.len() > 128 {
        return Err(AppError::Validation(vec![FieldError::new(
            "password",
            "Password must be at most 128 characters",
        )]));
    }

    Ok(())
}

/// Validates a phone number: digits with an optional leading `+`.
pub fn validate_phone(phone: &str) -> Result<()> {
    let digits = phone.strip_prefix('+').unwrap_or(phone);

    if digits.len() < 8 || digits.len() > 15 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(vec![FieldError::new(
            "phone",
            "Phone number is not valid",
        )]));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_emails() {
        assert!(validate_email("a@x.com").is_ok());
        assert!(validate_email("first.last@shop.example.vn").is_ok());
    }

    #[test]
    fn rejects_malformed_emails() {
        for bad in ["", "no-at-sign", "@x.com", "a@", "a@nodot"] {
            assert!(validate_email(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn password_length_bounds() {
        assert!(validate_password("Secret123").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password(&"x".repeat(129)).is_err());
        // Boundary: exactly 8 passes.
        assert!(validate_password("12345678").is_ok());
    }

    #[test]
    fn phone_shapes() {
        assert!(validate_phone("0900000000").is_ok());
        assert!(validate_phone("+84900000000").is_ok());
        assert!(validate_phone("123").is_err());
        assert!(validate_phone("09-000-000").is_err());
    }
}
