//! Field-level validation errors for MailChimp entities
//!
//! Entities declare their rules with `validator` derives. The errors are
//! flattened into a `field -> [reasons]` map, nested objects using dotted
//! keys (`contact.city`), which is the shape returned to API callers.

use serde::Serialize;
use std::collections::BTreeMap;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(reason.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Run the entity's declared rules on top of errors already collected while
/// filling it from input.
///
/// A field that failed to deserialize keeps only its type error; rule
/// failures for the same field (usually "required") would just repeat it.
pub fn validate<T: Validate>(value: &T, mut errors: FieldErrors) -> Result<(), FieldErrors> {
    if let Err(rule_errors) = value.validate() {
        let mut flattened = FieldErrors::default();
        flatten(&rule_errors, None, &mut flattened);

        for (field, reasons) in flattened.0 {
            let parent = field.split('.').next().unwrap_or(&field);
            if !errors.contains(parent) {
                errors.0.entry(field).or_default().extend(reasons);
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn flatten(errors: &ValidationErrors, prefix: Option<&str>, out: &mut FieldErrors) {
    for (field, kind) in errors.errors() {
        let path = match prefix {
            Some(prefix) => format!("{}.{}", prefix, field),
            None => field.to_string(),
        };

        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    out.add(path.clone(), describe(&path, error));
                }
            }
            ValidationErrorsKind::Struct(nested) => flatten(nested, Some(&path), out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    flatten(nested, Some(&format!("{}.{}", path, index)), out);
                }
            }
        }
    }
}

fn describe(path: &str, error: &ValidationError) -> String {
    let attribute = attribute_name(path);

    if let Some(message) = &error.message {
        return message.replace(":attribute", &attribute);
    }

    match &*error.code {
        "required" => format!("The {} field is required.", attribute),
        "email" => format!("The {} must be a valid email address.", attribute),
        "length" => format!("The {} has an invalid length.", attribute),
        code => format!("The {} is invalid ({}).", attribute, code),
    }
}

/// Human-readable attribute name: `contact.address1` -> `contact address1`
pub fn attribute_name(path: &str) -> String {
    path.replace(['_', '.'], " ")
}

/// Identifiers interpolated into MailChimp paths must stay a single segment.
pub fn is_path_segment(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

pub fn validate_visibility(value: &str) -> Result<(), ValidationError> {
    match value {
        "pub" | "prv" => Ok(()),
        _ => {
            let mut error = ValidationError::new("visibility");
            error.message = Some("The selected :attribute is invalid.".into());
            Err(error)
        }
    }
}
