use crate::error::AppError;

/// Collects field errors for a submitted form and reports them together.
#[derive(Debug, Default)]
pub struct FormValidator {
    errors: Vec<String>,
}

impl FormValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.errors.push(format!("{} is required", field));
        }
        self
    }

    pub fn required_some<T>(&mut self, field: &str, value: Option<&T>) -> &mut Self {
        if value.is_none() {
            self.errors.push(format!("{} is required", field));
        }
        self
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        if !value.trim().is_empty() && !is_valid_email(value.trim()) {
            self.errors.push(format!("{} must be a valid email address", field));
        }
        self
    }

    pub fn one_of(&mut self, field: &str, value: &str, allowed: &[&str]) -> &mut Self {
        if !allowed.contains(&value) {
            self.errors
                .push(format!("{} must be one of: {}", field, allowed.join(", ")));
        }
        self
    }

    pub fn range(&mut self, field: &str, value: i64, min: i64, max: i64) -> &mut Self {
        if value < min || value > max {
            self.errors
                .push(format!("{} must be between {} and {}", field, min, max));
        }
        self
    }

    pub fn check(&mut self, condition: bool, message: &str) -> &mut Self {
        if !condition {
            self.errors.push(message.to_string());
        }
        self
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn finish(&self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.errors.join("; ")))
        }
    }
}

fn is_valid_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .map(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
                    .unwrap_or(false)
        }
        None => false,
    }
}

/// Trims an optional form value, treating blank input as absent.
pub fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_all_errors() {
        let mut v = FormValidator::new();
        v.required("Name", "  ")
            .required("Area", "")
            .email("Email", "not-an-email");
        assert_eq!(v.errors().len(), 3);

        match v.finish() {
            Err(AppError::Validation(msg)) => {
                assert!(msg.contains("Name is required"));
                assert!(msg.contains("Email must be a valid email address"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_passes_valid_form() {
        let mut v = FormValidator::new();
        v.required("Name", "Riverside Park")
            .email("Email", "coach@example.co.uk")
            .one_of("Facility", "indoor", &["indoor", "outdoor"])
            .range("Students", 2, 1, 3);
        assert!(v.finish().is_ok());
    }

    #[test]
    fn test_email_rules() {
        assert!(is_valid_email("a@b.com"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@b.com"));
        assert!(!is_valid_email("a b@c.com"));
        assert!(!is_valid_email("a@@b.com"));
    }

    #[test]
    fn test_trimmed() {
        assert_eq!(trimmed(Some("  x ".into())), Some("x".into()));
        assert_eq!(trimmed(Some("   ".into())), None);
        assert_eq!(trimmed(None), None);
    }
}
