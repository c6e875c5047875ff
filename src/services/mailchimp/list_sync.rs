//! Keeps local list rows and MailChimp lists in lockstep
//!
//! Every write commits locally first and then calls MailChimp exactly once.
//! A failed remote call is reported to the caller but the local write stays,
//! so the two sides can diverge (e.g. a list row without `mail_chimp_id`).

use serde_json::{Map, Value};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use super::client::MailChimpApi;
use super::entities::{CampaignDefaults, Contact, ListAttributes, MailChimpList};
use super::error::SyncError;
use super::remote_id;
use super::validation::validate;

const RESOURCE: &str = "MailChimpList";

#[derive(Debug, sqlx::FromRow)]
struct ListRow {
    list_id: Uuid,
    mail_chimp_id: Option<String>,
    name: String,
    permission_reminder: String,
    use_archive_bar: Option<bool>,
    campaign_defaults: Json<CampaignDefaults>,
    notify_on_subscribe: Option<String>,
    notify_on_unsubscribe: Option<String>,
    email_type_option: bool,
    visibility: Option<String>,
    contact: Json<Contact>,
}

impl From<ListRow> for MailChimpList {
    fn from(row: ListRow) -> Self {
        MailChimpList {
            list_id: row.list_id,
            mail_chimp_id: row.mail_chimp_id,
            attributes: ListAttributes {
                name: Some(row.name),
                permission_reminder: Some(row.permission_reminder),
                use_archive_bar: row.use_archive_bar,
                campaign_defaults: Some(row.campaign_defaults.0),
                notify_on_subscribe: row.notify_on_subscribe,
                notify_on_unsubscribe: row.notify_on_unsubscribe,
                email_type_option: Some(row.email_type_option),
                visibility: row.visibility,
                contact: Some(row.contact.0),
            },
        }
    }
}

pub struct ListSynchronizer<C: MailChimpApi> {
    pool: PgPool,
    client: C,
}

impl<C: MailChimpApi> ListSynchronizer<C> {
    pub fn new(pool: PgPool, client: C) -> Self {
        Self { pool, client }
    }

    /// Create a list locally, then in MailChimp, then record the MailChimp id
    pub async fn create(&self, attributes: &Map<String, Value>) -> Result<MailChimpList, SyncError> {
        let mut list = MailChimpList::new();
        let type_errors = list.attributes.fill(attributes);
        validate(&list.attributes, type_errors)?;

        self.insert(&list).await?;

        let response = self
            .client
            .post("lists", &list.to_mail_chimp_body())
            .await
            .inspect_err(|e| {
                log::warn!(
                    "{}[{}] saved locally but MailChimp create failed: {}",
                    RESOURCE,
                    list.list_id,
                    e
                )
            })?;
        let mail_chimp_id = remote_id(&response)?;

        self.assign_mail_chimp_id(list.list_id, mail_chimp_id).await
    }

    pub async fn show(&self, id: &str) -> Result<MailChimpList, SyncError> {
        self.find(id).await
    }

    /// Merge attributes, save locally, then push the list to MailChimp
    pub async fn update(
        &self,
        id: &str,
        attributes: &Map<String, Value>,
    ) -> Result<MailChimpList, SyncError> {
        let mut list = self.find(id).await?;
        let type_errors = list.attributes.fill(attributes);
        validate(&list.attributes, type_errors)?;

        self.save(&list).await?;

        let Some(mail_chimp_id) = list.mail_chimp_id.as_deref() else {
            return Err(SyncError::remote(format!(
                "{}[{}] has no MailChimp id",
                RESOURCE, list.list_id
            )));
        };

        self.client
            .patch(
                &format!("lists/{}", mail_chimp_id),
                Some(&list.to_mail_chimp_body()),
            )
            .await
            .inspect_err(|e| {
                log::warn!(
                    "{}[{}] updated locally but MailChimp update failed: {}",
                    RESOURCE,
                    list.list_id,
                    e
                )
            })?;

        Ok(list)
    }

    /// Delete the local row, then the MailChimp list
    ///
    /// A list that never reached MailChimp has nothing to delete remotely.
    pub async fn remove(&self, id: &str) -> Result<(), SyncError> {
        let list = self.find(id).await?;

        sqlx::query("DELETE FROM mail_chimp_lists WHERE list_id = $1")
            .bind(list.list_id)
            .execute(&self.pool)
            .await?;

        match list.mail_chimp_id.as_deref() {
            Some(mail_chimp_id) => {
                self.client
                    .delete(&format!("lists/{}", mail_chimp_id))
                    .await
                    .inspect_err(|e| {
                        log::warn!(
                            "{}[{}] deleted locally but MailChimp delete failed: {}",
                            RESOURCE,
                            list.list_id,
                            e
                        )
                    })?;
            }
            None => log::debug!(
                "{}[{}] had no MailChimp id, skipping remote delete",
                RESOURCE,
                list.list_id
            ),
        }

        Ok(())
    }

    async fn find(&self, id: &str) -> Result<MailChimpList, SyncError> {
        let Ok(list_id) = Uuid::parse_str(id) else {
            return Err(SyncError::not_found(RESOURCE, id));
        };

        let row = sqlx::query_as::<_, ListRow>(
            r#"
            SELECT list_id, mail_chimp_id, name, permission_reminder, use_archive_bar,
                   campaign_defaults, notify_on_subscribe, notify_on_unsubscribe,
                   email_type_option, visibility, contact
            FROM mail_chimp_lists
            WHERE list_id = $1
            "#,
        )
        .bind(list_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(MailChimpList::from)
            .ok_or_else(|| SyncError::not_found(RESOURCE, id))
    }

    async fn insert(&self, list: &MailChimpList) -> Result<(), SyncError> {
        let attributes = &list.attributes;
        sqlx::query(
            r#"
            INSERT INTO mail_chimp_lists (
                list_id, name, permission_reminder, use_archive_bar, campaign_defaults,
                notify_on_subscribe, notify_on_unsubscribe, email_type_option, visibility, contact
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(list.list_id)
        .bind(&attributes.name)
        .bind(&attributes.permission_reminder)
        .bind(attributes.use_archive_bar)
        .bind(attributes.campaign_defaults.as_ref().map(Json))
        .bind(&attributes.notify_on_subscribe)
        .bind(&attributes.notify_on_unsubscribe)
        .bind(attributes.email_type_option)
        .bind(&attributes.visibility)
        .bind(attributes.contact.as_ref().map(Json))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save(&self, list: &MailChimpList) -> Result<(), SyncError> {
        let attributes = &list.attributes;
        sqlx::query(
            r#"
            UPDATE mail_chimp_lists
            SET name = $2,
                permission_reminder = $3,
                use_archive_bar = $4,
                campaign_defaults = $5,
                notify_on_subscribe = $6,
                notify_on_unsubscribe = $7,
                email_type_option = $8,
                visibility = $9,
                contact = $10,
                updated_at = NOW()
            WHERE list_id = $1
            "#,
        )
        .bind(list.list_id)
        .bind(&attributes.name)
        .bind(&attributes.permission_reminder)
        .bind(attributes.use_archive_bar)
        .bind(attributes.campaign_defaults.as_ref().map(Json))
        .bind(&attributes.notify_on_subscribe)
        .bind(&attributes.notify_on_unsubscribe)
        .bind(attributes.email_type_option)
        .bind(&attributes.visibility)
        .bind(attributes.contact.as_ref().map(Json))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Record the MailChimp id; only the first assignment sticks
    async fn assign_mail_chimp_id(
        &self,
        list_id: Uuid,
        mail_chimp_id: &str,
    ) -> Result<MailChimpList, SyncError> {
        let result = sqlx::query(
            r#"
            UPDATE mail_chimp_lists
            SET mail_chimp_id = $2, updated_at = NOW()
            WHERE list_id = $1 AND mail_chimp_id IS NULL
            "#,
        )
        .bind(list_id)
        .bind(mail_chimp_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            log::info!(
                "{}[{}] linked to MailChimp list {}",
                RESOURCE,
                list_id,
                mail_chimp_id
            );
        } else {
            log::warn!(
                "{}[{}] was removed or already linked before MailChimp id {} arrived",
                RESOURCE,
                list_id,
                mail_chimp_id
            );
        }

        self.find(&list_id.to_string()).await
    }
}
