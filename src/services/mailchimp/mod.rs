//! MailChimp list and member synchronization
//!
//! Local Postgres rows mirror MailChimp lists and members. The synchronizers
//! validate input, write locally, call MailChimp once and record the
//! identifier MailChimp assigns.

mod client;
mod entities;
mod error;
mod list_sync;
mod member_sync;
mod validation;

pub use client::{MailChimpApi, MailChimpClient, MailChimpError};
pub use entities::{
    CampaignDefaults, Contact, ListAttributes, MailChimpList, MailChimpMember, MemberAttributes,
};
pub use error::SyncError;
pub use list_sync::ListSynchronizer;
pub use member_sync::MemberSynchronizer;
pub use validation::FieldErrors;

use serde_json::Value;

/// Identifier MailChimp assigned to a newly created resource
fn remote_id(response: &Value) -> Result<&str, SyncError> {
    response
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| SyncError::remote("MailChimp response did not include an id"))
}
