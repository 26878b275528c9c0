//! Per-profile Supabase sessions kept in the OS keychain.

use std::sync::Arc;

use zenflow_core::auth::{AuthResult, SessionPersistence, SupabaseAuthClient};
pub use zenflow_core::auth::{AuthError, AuthSession};
use zenflow_core::config::SyncConfig;
use zenflow_core::sync::SessionProvider;

use crate::error::CliError;

/// Keychain entry for one profile's session JSON
#[derive(Clone)]
pub struct SessionStore {
    account: String,
}

impl SessionStore {
    pub fn new(profile_name: &str) -> Self {
        Self {
            account: format!("session/{profile_name}"),
        }
    }
}

impl SessionPersistence for SessionStore {
    fn load_session(&self) -> AuthResult<Option<AuthSession>> {
        match secret::read(&self.account)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
        secret::write(&self.account, &serde_json::to_string(session)?)
    }

    fn clear_session(&self) -> AuthResult<()> {
        secret::delete(&self.account)
    }
}

#[cfg(not(test))]
mod secret {
    use keyring::Entry;
    use zenflow_core::auth::{AuthError, AuthResult};

    const SERVICE: &str = "zenflow-cli";

    fn storage_error(error: keyring::Error) -> AuthError {
        AuthError::SecureStorage(error.to_string())
    }

    fn entry(account: &str) -> AuthResult<Entry> {
        Entry::new(SERVICE, account).map_err(storage_error)
    }

    pub fn read(account: &str) -> AuthResult<Option<String>> {
        match entry(account)?.get_password() {
            Ok(raw) => Ok(Some(raw)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(storage_error(error)),
        }
    }

    pub fn write(account: &str, raw: &str) -> AuthResult<()> {
        entry(account)?.set_password(raw).map_err(storage_error)
    }

    pub fn delete(account: &str) -> AuthResult<()> {
        match entry(account)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(storage_error(error)),
        }
    }
}


/// Auth client bound to one profile's keychain entry
#[derive(Clone)]
pub struct SupabaseAuthService {
    inner: SupabaseAuthClient<SessionStore>,
}

impl SupabaseAuthService {
    /// `None` when the profile has no Supabase endpoint configured.
    pub fn new_for_profile(profile_name: &str, config: &SyncConfig) -> Result<Option<Self>, CliError> {
        let Some(endpoint) = config.supabase()? else {
            return Ok(None);
        };
        let inner = SupabaseAuthClient::from_endpoint(&endpoint, SessionStore::new(profile_name))?;
        Ok(Some(Self { inner }))
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        self.inner.sign_in(email, password).await
    }

    pub async fn restore_session(&self) -> AuthResult<Option<AuthSession>> {
        self.inner.restore_session().await
    }

    pub async fn sign_out(&self, access_token: &str) -> AuthResult<()> {
        self.inner.sign_out(access_token).await
    }

    /// Session source for the sync engine
    pub fn session_provider(&self) -> Arc<dyn SessionProvider> {
        Arc::new(self.inner.clone())
    }
}

pub fn load_stored_session(profile_name: &str) -> AuthResult<Option<AuthSession>> {
    SessionStore::new(profile_name).load_session()
}

pub fn clear_stored_session(profile_name: &str) -> AuthResult<()> {
    SessionStore::new(profile_name).clear_session()
}

#[cfg(test)]
mod tests {
    use zenflow_core::auth::AuthUser;

    use super::*;

    fn session(user: &str) -> AuthSession {
        AuthSession {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: i64::MAX,
            user: AuthUser {
                id: user.to_string(),
                email: None,
            },
        }
    }

    #[test]
    fn sessions_are_isolated_per_profile() {
        let work = SessionStore::new("auth-test-work");
        let home = SessionStore::new("auth-test-home");

        work.save_session(&session("worker")).unwrap();
        assert_eq!(
            load_stored_session("auth-test-work").unwrap().unwrap().user.id,
            "worker"
        );
        assert!(home.load_session().unwrap().is_none());

        clear_stored_session("auth-test-work").unwrap();
        assert!(work.load_session().unwrap().is_none());
    }

    #[test]
    fn clearing_missing_session_is_ok() {
        assert!(clear_stored_session("auth-test-never-saved").is_ok());
    }

    #[test]
    fn profile_without_endpoint_has_no_service() {
        let service = SupabaseAuthService::new_for_profile("default", &SyncConfig::default()).unwrap();
        assert!(service.is_none());
    }

    #[test]
    fn half_configured_profile_is_an_error() {
        let config = SyncConfig {
            supabase_url: Some("https://demo.supabase.co".to_string()),
            ..SyncConfig::default()
        };
        assert!(SupabaseAuthService::new_for_profile("default", &config).is_err());
    }
}
