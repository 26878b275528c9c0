//! Remote backup table: one row per user holding the latest payload.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::{error_body_message, AuthSession};
use crate::backup::BackupPayload;
use crate::config::SupabaseEndpoint;
use crate::error::{Error, Result};
use crate::util::iso_timestamp_now;

/// PostgREST table holding user backups
pub const BACKUP_TABLE: &str = "user_backups";

/// Row as read from the backup table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteBackupRow {
    /// Raw payload; normalized by the caller before use
    pub payload: Value,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Serialize)]
struct UpsertRow<'a> {
    user_id: &'a str,
    payload: &'a BackupPayload,
    updated_at: String,
}

/// Last-write-wins document store keyed by user id.
#[async_trait]
pub trait RemoteBackupStore: Send + Sync {
    /// The user's row, or `None` on first sync
    async fn fetch(&self, session: &AuthSession) -> Result<Option<RemoteBackupRow>>;

    /// Replace the user's row wholesale
    async fn upsert(&self, session: &AuthSession, payload: &BackupPayload) -> Result<()>;
}

/// `user_backups` over Supabase PostgREST
#[derive(Clone)]
pub struct SupabaseBackupTable {
    table_url: String,
    anon_key: String,
    client: Client,
}

impl SupabaseBackupTable {
    pub fn new(endpoint: &SupabaseEndpoint) -> Result<Self> {
        Ok(Self {
            table_url: format!("{}/{BACKUP_TABLE}", endpoint.rest_url()),
            anon_key: endpoint.anon_key.clone(),
            client: Client::builder().build()?,
        })
    }

    fn authorized(&self, request: RequestBuilder, session: &AuthSession) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message =
            error_body_message(&body).unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
        Err(Error::Remote {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl RemoteBackupStore for SupabaseBackupTable {
    async fn fetch(&self, session: &AuthSession) -> Result<Option<RemoteBackupRow>> {
        let url = format!(
            "{}?select=payload,updated_at&user_id=eq.{}&limit=1",
            self.table_url,
            urlencoding::encode(&session.user.id)
        );
        let request = self
            .authorized(self.client.get(url), session)
            .header(reqwest::header::ACCEPT, "application/json");

        let response = Self::check(request.send().await?).await?;
        let rows: Vec<RemoteBackupRow> = response.json().await?;
        Ok(rows.into_iter().next())
    }

    async fn upsert(&self, session: &AuthSession, payload: &BackupPayload) -> Result<()> {
        let row = UpsertRow {
            user_id: &session.user.id,
            payload,
            updated_at: iso_timestamp_now(),
        };
        let request = self
            .authorized(
                self.client
                    .post(format!("{}?on_conflict=user_id", self.table_url)),
                session,
            )
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&[row]);

        Self::check(request.send().await?).await?;
        tracing::debug!(user_id = %session.user.id, "Upserted remote backup");
        Ok(())
    }
}
