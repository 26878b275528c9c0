//! In-memory remote and session fakes shared by the sync tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use super::remote::{RemoteBackupRow, RemoteBackupStore};
use super::session::SessionProvider;
use crate::auth::{AuthSession, AuthUser};
use crate::backup::BackupPayload;
use crate::db::{KeyValueStore, LocalStore};
use crate::error::Result;
use crate::models::{Collection, Record};

#[derive(Default)]
pub struct FakeRemote {
    row: Mutex<Option<Value>>,
    pub hang: AtomicBool,
    pub fetches: AtomicUsize,
    pub upserts: AtomicUsize,
}

impl FakeRemote {
    pub fn with_payload(payload: Value) -> Self {
        Self {
            row: Mutex::new(Some(payload)),
            ..Self::default()
        }
    }

    pub fn payload(&self) -> Option<Value> {
        self.row.lock().unwrap().clone()
    }

    pub fn upserts(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteBackupStore for FakeRemote {
    async fn fetch(&self, _session: &AuthSession) -> Result<Option<RemoteBackupRow>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        // Suspend like a real network call.
        tokio::task::yield_now().await;
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(self.payload().map(|payload| RemoteBackupRow {
            payload,
            updated_at: None,
        }))
    }

    async fn upsert(&self, _session: &AuthSession, payload: &BackupPayload) -> Result<()> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        *self.row.lock().unwrap() = Some(serde_json::to_value(payload)?);
        Ok(())
    }
}

pub struct FakeSessions(pub Option<AuthSession>);

impl FakeSessions {
    pub fn signed_in() -> Self {
        Self(Some(AuthSession {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: i64::MAX,
            user: AuthUser {
                id: "user-1".to_string(),
                email: Some("user@example.com".to_string()),
            },
        }))
    }
}

#[async_trait]
impl SessionProvider for FakeSessions {
    async fn current_session(&self) -> Result<Option<AuthSession>> {
        Ok(self.0.clone())
    }
}

pub fn remote_payload(data: Value) -> Value {
    json!({
        "schemaVersion": 2,
        "createdAt": "2026-03-01T10:00:00.000Z",
        "deviceId": "device_remote",
        "data": data
    })
}

pub async fn store_with(collection: Collection, records: &[Value]) -> Arc<KeyValueStore> {
    let store = Arc::new(KeyValueStore::in_memory());
    for record in records {
        let record: Record = record.as_object().cloned().unwrap();
        store.put(collection, record).await.unwrap();
    }
    store
}

/// Ids of a collection inside a raw payload, sorted
pub fn payload_ids(payload: &Value, field: &str) -> Vec<String> {
    let mut ids: Vec<String> = payload["data"][field]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["id"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    ids.sort();
    ids
}
