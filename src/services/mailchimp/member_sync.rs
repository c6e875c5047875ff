//! Keeps local member rows and MailChimp subscribers in lockstep
//!
//! Members are addressed remotely by `lists/{list_id}/members/{subscriber_hash}`.
//! `list_id` is the MailChimp list id supplied when the member was created
//! (there is no local list lookup) and `subscriber_hash` is whatever id
//! MailChimp returned for the new subscriber. Neither changes afterwards.

use serde_json::{Map, Value};
use sqlx::PgPool;
use uuid::Uuid;

use super::client::MailChimpApi;
use super::entities::{MailChimpMember, MemberAttributes};
use super::error::SyncError;
use super::remote_id;
use super::validation::{FieldErrors, is_path_segment, validate};

const RESOURCE: &str = "MailChimpMember";

#[derive(Debug, sqlx::FromRow)]
struct MemberRow {
    member_id: Uuid,
    list_id: String,
    email_address: String,
    status: String,
    subscriber_hash: Option<String>,
}

impl From<MemberRow> for MailChimpMember {
    fn from(row: MemberRow) -> Self {
        MailChimpMember {
            member_id: row.member_id,
            list_id: row.list_id,
            attributes: MemberAttributes {
                email_address: Some(row.email_address),
                status: Some(row.status),
            },
            subscriber_hash: row.subscriber_hash,
        }
    }
}

pub struct MemberSynchronizer<C: MailChimpApi> {
    pool: PgPool,
    client: C,
}

impl<C: MailChimpApi> MemberSynchronizer<C> {
    pub fn new(pool: PgPool, client: C) -> Self {
        Self { pool, client }
    }

    /// Subscribe a member to the MailChimp list `mail_chimp_list_id`
    ///
    /// The member row is saved before MailChimp is called; the subscriber
    /// hash is recorded only once MailChimp accepts the member.
    pub async fn create(
        &self,
        mail_chimp_list_id: &str,
        attributes: &Map<String, Value>,
    ) -> Result<MailChimpMember, SyncError> {
        let mut member = MailChimpMember::new(mail_chimp_list_id);
        let mut type_errors = member.attributes.fill(attributes);
        if !is_path_segment(mail_chimp_list_id) {
            type_errors.add("list_id", "The list id format is invalid.");
        }
        validate(&member.attributes, type_errors)?;

        self.insert(&member).await?;

        let response = self
            .client
            .post(
                &format!("lists/{}/members", mail_chimp_list_id),
                &member.to_mail_chimp_body(),
            )
            .await
            .inspect_err(|e| {
                log::warn!(
                    "{}[{}] saved locally but MailChimp subscribe failed: {}",
                    RESOURCE,
                    member.member_id,
                    e
                )
            })?;
        let subscriber_hash = remote_id(&response)?;

        self.assign_subscriber_hash(member.member_id, subscriber_hash)
            .await
    }

    pub async fn show(&self, id: &str) -> Result<MailChimpMember, SyncError> {
        self.find(id).await
    }

    /// Merge `email_address` / `status`, save locally, then patch MailChimp
    ///
    /// The subscriber hash is not rotated even when the email changes.
    pub async fn update(
        &self,
        id: &str,
        attributes: &Map<String, Value>,
    ) -> Result<MailChimpMember, SyncError> {
        let mut member = self.find(id).await?;
        let type_errors = member.attributes.fill(attributes);
        validate(&member.attributes, type_errors)?;

        self.save(&member).await?;

        let path = remote_path(&member).ok_or_else(|| {
            SyncError::remote(format!(
                "{}[{}] has no subscriber hash",
                RESOURCE, member.member_id
            ))
        })?;

        self.client
            .patch(&path, Some(&member.to_mail_chimp_body()))
            .await
            .inspect_err(|e| {
                log::warn!(
                    "{}[{}] updated locally but MailChimp update failed: {}",
                    RESOURCE,
                    member.member_id,
                    e
                )
            })?;

        Ok(member)
    }

    /// Delete the local row, then the MailChimp subscriber
    pub async fn remove(&self, id: &str) -> Result<(), SyncError> {
        let member = self.find(id).await?;

        sqlx::query("DELETE FROM mail_chimp_members WHERE member_id = $1")
            .bind(member.member_id)
            .execute(&self.pool)
            .await?;

        match remote_path(&member) {
            Some(path) => {
                self.client.delete(&path).await.inspect_err(|e| {
                    log::warn!(
                        "{}[{}] deleted locally but MailChimp delete failed: {}",
                        RESOURCE,
                        member.member_id,
                        e
                    )
                })?;
            }
            None => log::debug!(
                "{}[{}] had no subscriber hash, skipping remote delete",
                RESOURCE,
                member.member_id
            ),
        }

        Ok(())
    }

    async fn find(&self, id: &str) -> Result<MailChimpMember, SyncError> {
        let Ok(member_id) = Uuid::parse_str(id) else {
            return Err(SyncError::not_found(RESOURCE, id));
        };

        let row = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT member_id, list_id, email_address, status, subscriber_hash
            FROM mail_chimp_members
            WHERE member_id = $1
            "#,
        )
        .bind(member_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(MailChimpMember::from)
            .ok_or_else(|| SyncError::not_found(RESOURCE, id))
    }

    async fn insert(&self, member: &MailChimpMember) -> Result<(), SyncError> {
        sqlx::query(
            r#"
            INSERT INTO mail_chimp_members (member_id, list_id, email_address, status)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(member.member_id)
        .bind(&member.list_id)
        .bind(&member.attributes.email_address)
        .bind(&member.attributes.status)
        .execute(&self.pool)
        .await
        .map_err(email_taken)?;

        Ok(())
    }

    async fn save(&self, member: &MailChimpMember) -> Result<(), SyncError> {
        sqlx::query(
            r#"
            UPDATE mail_chimp_members
            SET email_address = $2, status = $3, updated_at = NOW()
            WHERE member_id = $1
            "#,
        )
        .bind(member.member_id)
        .bind(&member.attributes.email_address)
        .bind(&member.attributes.status)
        .execute(&self.pool)
        .await
        .map_err(email_taken)?;

        Ok(())
    }

    /// Record the subscriber hash; only the first assignment sticks
    async fn assign_subscriber_hash(
        &self,
        member_id: Uuid,
        subscriber_hash: &str,
    ) -> Result<MailChimpMember, SyncError> {
        let result = sqlx::query(
            r#"
            UPDATE mail_chimp_members
            SET subscriber_hash = $2, updated_at = NOW()
            WHERE member_id = $1 AND subscriber_hash IS NULL
            "#,
        )
        .bind(member_id)
        .bind(subscriber_hash)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            log::debug!("{}[{}] subscribed as {}", RESOURCE, member_id, subscriber_hash);
        } else {
            log::warn!(
                "{}[{}] was removed or already linked before subscriber hash {} arrived",
                RESOURCE,
                member_id,
                subscriber_hash
            );
        }

        self.find(&member_id.to_string()).await
    }
}

fn remote_path(member: &MailChimpMember) -> Option<String> {
    member
        .subscriber_hash
        .as_deref()
        .map(|hash| format!("lists/{}/members/{}", member.list_id, hash))
}

/// Email addresses are unique per list
fn email_taken(error: sqlx::Error) -> SyncError {
    match &error {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            let mut errors = FieldErrors::default();
            errors.add("email_address", "The email address has already been taken.");
            errors.into()
        }
        _ => error.into(),
    }
}
