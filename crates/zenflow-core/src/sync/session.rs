//! Authenticated-user lookup for cloud sync

use async_trait::async_trait;

use crate::auth::{AuthSession, SessionPersistence, SupabaseAuthClient};
use crate::error::Result;

/// Resolves the signed-in user; `None` means nobody is signed in.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn current_session(&self) -> Result<Option<AuthSession>>;
}

#[async_trait]
impl<S: SessionPersistence> SessionProvider for SupabaseAuthClient<S> {
    async fn current_session(&self) -> Result<Option<AuthSession>> {
        Ok(self.restore_session().await?)
    }
}
