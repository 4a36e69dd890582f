use lazy_static::lazy_static;
use regex::Regex;
use super::error::{Error, FieldError};

// Request body validation. Errors accumulate instead of
// bailing on the first one so clients can show everything
// that's wrong with a form at once.

// Good enough for a newsletter signup form. Full RFC 5322
// is a rabbit hole nobody needs to go down.
pub fn is_valid_email(email: &str) -> bool {
  lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(
      r"^[^\s@]+@[^\s@]+\.[^\s@]+$"
    ).unwrap();
  }
  EMAIL_REGEX.is_match(email)
}

pub struct Validator {
  errors: Vec<FieldError>
}

impl Validator {

  pub fn new() -> Self {
    Self { errors: Vec::new() }
  }

  pub fn require(&mut self, field: &'static str, value: &str) -> &mut Self {
    if value.trim().is_empty() {
      self.errors.push(FieldError {
        field,
        message: format!("{} is required", field)
      });
    }
    self
  }

  pub fn email(&mut self, field: &'static str, value: &str) -> &mut Self {
    if !is_valid_email(value) {
      self.errors.push(FieldError {
        field,
        message: "Invalid email address".to_string()
      });
    }
    self
  }

  pub fn min_length(
    &mut self,
    field: &'static str,
    value: &str,
    min: usize
  ) -> &mut Self {
    if value.chars().count() < min {
      self.errors.push(FieldError {
        field,
        message: format!("{} must be at least {} characters", field, min)
      });
    }
    self
  }

  pub fn max_length(
    &mut self,
    field: &'static str,
    value: &str,
    max: usize
  ) -> &mut Self {
    if value.chars().count() > max {
      self.errors.push(FieldError {
        field,
        message: format!("{} must be at most {} characters", field, max)
      });
    }
    self
  }

  // Anything past this is a millisecond timestamp or
  // garbage (it's somewhere in the year 3000):
  const MAX_TIMESTAMP: i64 = 32503680000;

  pub fn timestamp(&mut self, field: &'static str, value: i64) -> &mut Self {
    if value < 0 || value > Self::MAX_TIMESTAMP {
      self.errors.push(FieldError {
        field,
        message: format!("{} must be a unix timestamp in seconds", field)
      });
    }
    self
  }

  pub fn positive(&mut self, field: &'static str, value: i32) -> &mut Self {
    if value <= 0 {
      self.errors.push(FieldError {
        field,
        message: format!("{} must be a positive id", field)
      });
    }
    self
  }

  // Consumes the accumulated errors, leaving the validator
  // reusable (it won't be, in practice).
  pub fn check(&mut self) -> Result<(), Error> {
    if self.errors.is_empty() {
      Ok(())
    } else {
      Err(Error::Validation(std::mem::take(&mut self.errors)))
    }
  }

}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn accepts_normal_emails() {
    assert!(is_valid_email("reader@example.com"));
    assert!(is_valid_email("first.last+tag@sub.domain.org"));
  }

  #[test]
  fn rejects_junk_emails() {
    assert!(!is_valid_email(""));
    assert!(!is_valid_email("no-at-sign"));
    assert!(!is_valid_email("two@@example.com"));
    assert!(!is_valid_email("spaces in@example.com"));
    assert!(!is_valid_email("no-tld@example"));
  }

  #[test]
  fn validator_accumulates_all_errors() {
    let result = Validator::new()
      .require("title", "  ")
      .email("email", "nope")
      .min_length("password", "short", 8)
      .check();
    match result {
      Err(Error::Validation(errors)) => {
        assert_eq!(3, errors.len());
        assert_eq!("title", errors[0].field);
      },
      _ => panic!("expected a validation error")
    }
  }

  #[test]
  fn rejects_out_of_range_timestamps() {
    assert!(Validator::new().timestamp("date", i64::MAX).check().is_err());
    assert!(Validator::new().timestamp("date", -1).check().is_err());
    assert!(Validator::new().timestamp("date", 1615150740).check().is_ok());
  }

  #[test]
  fn validator_passes_clean_input() {
    assert!(
      Validator::new()
        .require("title", "A title")
        .email("email", "reader@example.com")
        .check()
        .is_ok()
    );
  }
}
