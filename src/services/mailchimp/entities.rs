//! Local representations of MailChimp lists and members
//!
//! Entities are filled from untrusted JSON attribute maps. Only known
//! attributes are applied; identifiers assigned locally or by MailChimp are
//! never taken from input.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;
use validator::Validate;

use super::validation::{FieldErrors, attribute_name, validate_visibility};

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CampaignDefaults {
    #[validate(required)]
    #[serde(deserialize_with = "blank_as_none")]
    pub from_name: Option<String>,
    #[validate(required, email)]
    #[serde(deserialize_with = "blank_as_none")]
    pub from_email: Option<String>,
    #[validate(required)]
    #[serde(deserialize_with = "blank_as_none")]
    pub subject: Option<String>,
    #[validate(required)]
    #[serde(deserialize_with = "blank_as_none")]
    pub language: Option<String>,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Contact {
    #[validate(required)]
    #[serde(deserialize_with = "blank_as_none")]
    pub company: Option<String>,
    #[validate(required)]
    #[serde(deserialize_with = "blank_as_none")]
    pub address1: Option<String>,
    #[serde(deserialize_with = "blank_as_none")]
    pub address2: Option<String>,
    #[validate(required)]
    #[serde(deserialize_with = "blank_as_none")]
    pub city: Option<String>,
    #[validate(required)]
    #[serde(deserialize_with = "blank_as_none")]
    pub state: Option<String>,
    #[validate(required)]
    #[serde(deserialize_with = "blank_as_none")]
    pub zip: Option<String>,
    #[validate(
        required,
        length(equal = 2, message = "The :attribute must be 2 characters.")
    )]
    #[serde(deserialize_with = "blank_as_none")]
    pub country: Option<String>,
    #[serde(deserialize_with = "blank_as_none")]
    pub phone: Option<String>,
}

/// List attributes forwarded verbatim to MailChimp
#[derive(Debug, Clone, Default, PartialEq, Serialize, Validate)]
pub struct ListAttributes {
    #[validate(required)]
    pub name: Option<String>,
    #[validate(required)]
    pub permission_reminder: Option<String>,
    pub use_archive_bar: Option<bool>,
    #[validate(required, nested)]
    pub campaign_defaults: Option<CampaignDefaults>,
    #[validate(email)]
    pub notify_on_subscribe: Option<String>,
    #[validate(email)]
    pub notify_on_unsubscribe: Option<String>,
    #[validate(required)]
    pub email_type_option: Option<bool>,
    #[validate(custom(function = "validate_visibility"))]
    pub visibility: Option<String>,
    #[validate(required, nested)]
    pub contact: Option<Contact>,
}

impl ListAttributes {
    /// Merge supplied attributes; returns type errors for values that could
    /// not be read as the attribute's type.
    pub fn fill(&mut self, attributes: &Map<String, Value>) -> FieldErrors {
        let mut errors = FieldErrors::default();

        assign(&mut self.name, attributes, "name", &mut errors);
        assign(
            &mut self.permission_reminder,
            attributes,
            "permission_reminder",
            &mut errors,
        );
        assign(
            &mut self.use_archive_bar,
            attributes,
            "use_archive_bar",
            &mut errors,
        );
        assign_object(
            &mut self.campaign_defaults,
            attributes,
            "campaign_defaults",
            &mut errors,
        );
        assign(
            &mut self.notify_on_subscribe,
            attributes,
            "notify_on_subscribe",
            &mut errors,
        );
        assign(
            &mut self.notify_on_unsubscribe,
            attributes,
            "notify_on_unsubscribe",
            &mut errors,
        );
        assign(
            &mut self.email_type_option,
            attributes,
            "email_type_option",
            &mut errors,
        );
        assign(&mut self.visibility, attributes, "visibility", &mut errors);
        assign_object(&mut self.contact, attributes, "contact", &mut errors);

        errors
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MailChimpList {
    pub list_id: Uuid,
    pub mail_chimp_id: Option<String>,
    #[serde(flatten)]
    pub attributes: ListAttributes,
}

impl MailChimpList {
    pub fn new() -> Self {
        Self {
            list_id: Uuid::new_v4(),
            mail_chimp_id: None,
            attributes: ListAttributes::default(),
        }
    }

    /// Request body for MailChimp's list endpoints; unset attributes are left out
    pub fn to_mail_chimp_body(&self) -> Value {
        let mut body = serde_json::to_value(&self.attributes).unwrap_or_default();
        if let Value::Object(fields) = &mut body {
            fields.retain(|_, value| !value.is_null());
        }
        body
    }
}

impl Default for MailChimpList {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Validate)]
pub struct MemberAttributes {
    #[validate(required, email)]
    pub email_address: Option<String>,
    #[validate(required)]
    pub status: Option<String>,
}

impl MemberAttributes {
    /// Merge supplied attributes; returns type errors.
    ///
    /// `list_id` and `subscriber_hash` are accepted as nullable strings but
    /// never applied: both address the remote subscriber and are fixed once
    /// the member exists.
    pub fn fill(&mut self, attributes: &Map<String, Value>) -> FieldErrors {
        let mut errors = FieldErrors::default();

        assign(
            &mut self.email_address,
            attributes,
            "email_address",
            &mut errors,
        );
        assign(&mut self.status, attributes, "status", &mut errors);

        let mut ignored: Option<String> = None;
        assign(&mut ignored, attributes, "list_id", &mut errors);
        assign(&mut ignored, attributes, "subscriber_hash", &mut errors);

        errors
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MailChimpMember {
    pub member_id: Uuid,
    pub list_id: String,
    #[serde(flatten)]
    pub attributes: MemberAttributes,
    pub subscriber_hash: Option<String>,
}

impl MailChimpMember {
    pub fn new(list_id: &str) -> Self {
        Self {
            member_id: Uuid::new_v4(),
            list_id: list_id.to_string(),
            attributes: MemberAttributes::default(),
            subscriber_hash: None,
        }
    }

    /// Request body for MailChimp's member endpoints
    pub fn to_mail_chimp_body(&self) -> Value {
        serde_json::to_value(&self.attributes).unwrap_or_default()
    }
}

/// Apply one attribute from input onto `slot`.
///
/// Absent keys leave the slot alone, `null` and blank strings clear it.
fn assign<T: DeserializeOwned>(
    slot: &mut Option<T>,
    attributes: &Map<String, Value>,
    key: &str,
    errors: &mut FieldErrors,
) {
    let Some(value) = attributes.get(key) else {
        return;
    };

    match value {
        Value::Null => *slot = None,
        Value::String(s) if s.trim().is_empty() => *slot = None,
        value => match T::deserialize(value) {
            Ok(parsed) => *slot = Some(parsed),
            Err(_) => invalid_type(key, errors),
        },
    }
}

/// Like [`assign`] for attributes that are JSON objects.
///
/// Serde reads a struct from a sequence by position, so arrays have to be
/// turned away before deserializing.
fn assign_object<T: DeserializeOwned>(
    slot: &mut Option<T>,
    attributes: &Map<String, Value>,
    key: &str,
    errors: &mut FieldErrors,
) {
    match attributes.get(key) {
        None | Some(Value::Null | Value::Object(_)) => assign(slot, attributes, key, errors),
        Some(Value::String(s)) if s.trim().is_empty() => assign(slot, attributes, key, errors),
        Some(_) => invalid_type(key, errors),
    }
}

fn invalid_type(key: &str, errors: &mut FieldErrors) {
    errors.add(
        key,
        format!("The {} field has an invalid type.", attribute_name(key)),
    );
}

/// Nested strings follow the top-level rule: blank means unset.
fn blank_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}
