use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// A single failed validation rule.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.message)
    }
}

/// Ordered list of failed validation rules.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(ValidationError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn on(&self, field: &str) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(move |error| error.field == field)
            .map(|error| error.message.as_str())
    }

    pub fn has_error_on(&self, field: &str) -> bool {
        self.on(field).next().is_some()
    }

    /// Converts the list into a `Result`, failing when any rule was broken.
    pub fn into_result(self) -> crate::Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(crate::Error::ValidationError(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, error) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

pub trait Validate {
    fn validate(&self) -> ValidationErrors;

    fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

/// A field assigned from loosely typed input.
///
/// Assignment never fails; a value that cannot be decoded is kept verbatim
/// and reported when the owner is validated.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub enum FieldValue<T> {
    Unset,
    Value(T),
    Invalid(String),
}

impl<T> Default for FieldValue<T> {
    fn default() -> Self {
        FieldValue::Unset
    }
}

impl<T> FieldValue<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            FieldValue::Value(value) => Some(value),
            _ => None,
        }
    }
}

impl<T: Copy> FieldValue<T> {
    pub fn get(&self) -> Option<T> {
        self.value().copied()
    }
}

impl<T: FromStr> FieldValue<T> {
    /// Decodes `raw` with `FromStr`, `None` clears the field.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None => FieldValue::Unset,
            Some(raw) => match raw.parse() {
                Ok(value) => FieldValue::Value(value),
                Err(_) => FieldValue::Invalid(raw.to_string()),
            },
        }
    }
}

/// Rails style presence/inclusion check shared by the enumerated fields.
pub(crate) fn check_inclusion<T>(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: &FieldValue<T>,
    required: bool,
) {
    match value {
        FieldValue::Unset if required => errors.add(field, "can't be blank"),
        FieldValue::Invalid(raw) => {
            errors.add(field, format!("'{raw}' is not included in the list"))
        }
        _ => {}
    }
}
