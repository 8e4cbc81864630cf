use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::token::decode_claims;

/// The one key the bearer credential is persisted under, in every backend
pub const TOKEN_KEY: &str = "jwt_token";

/// Keychain service name
const SERVICE_NAME: &str = "taskdeck";

/// Persistence for a single bearer credential
pub trait TokenStorage: Send + Sync {
    fn load(&self) -> Result<Option<String>>;
    fn store(&self, token: &str) -> Result<()>;
    /// Removing an absent credential is not an error
    fn remove(&self) -> Result<()>;
}

/// Credential kept in the OS keychain
#[derive(Debug, Clone)]
pub struct KeyringStorage {
    service: String,
}

impl KeyringStorage {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(&self.service, TOKEN_KEY).context("Failed to create keyring entry")
    }
}

impl Default for KeyringStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStorage for KeyringStorage {
    fn load(&self) -> Result<Option<String>> {
        match self.entry()?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve credential from keychain"),
        }
    }

    fn store(&self, token: &str) -> Result<()> {
        self.entry()?
            .set_password(token)
            .context("Failed to store credential in keychain")
    }

    fn remove(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete credential from keychain"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenFile {
    jwt_token: String,
}

/// Credential kept in a JSON file, readable by the owner only
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStorage for FileStorage {
    fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents =
            std::fs::read_to_string(&self.path).context("Failed to read credential file")?;
        let file: TokenFile =
            serde_json::from_str(&contents).context("Failed to parse credential file")?;
        Ok(Some(file.jwt_token))
    }

    fn store(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&TokenFile {
            jwt_token: token.to_string(),
        })?;
        std::fs::write(&self.path, contents).context("Failed to write credential file")?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("Failed to delete credential file"),
        }
    }
}

/// Credential kept in process memory only
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slot: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStorage for MemoryStorage {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn store(&self, token: &str) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Owner of the stored bearer credential.
///
/// Shared as `Arc<TokenStore>` between the API client, which reads and
/// invalidates it, and the session controller, which writes it on login.
pub struct TokenStore {
    backend: Box<dyn TokenStorage>,
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore").finish_non_exhaustive()
    }
}

impl TokenStore {
    pub fn new(backend: impl TokenStorage + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::new())
    }

    /// Persist a credential, replacing any previous one
    pub fn save(&self, token: &str) -> Result<()> {
        self.backend.store(token)?;
        debug!("Stored bearer credential");
        Ok(())
    }

    /// The stored credential, if any. Storage failures read as absent.
    pub fn read(&self) -> Option<String> {
        match self.backend.load() {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(error = %e, "Failed to read stored credential");
                None
            }
        }
    }

    pub fn clear(&self) {
        if let Err(e) = self.backend.remove() {
            warn!(error = %e, "Failed to clear stored credential");
        } else {
            debug!("Cleared stored credential");
        }
    }

    /// Clear the stored credential only if it is still `token`.
    /// Returns whether anything was cleared.
    pub fn clear_if_current(&self, token: &str) -> bool {
        if self.read().as_deref() == Some(token) {
            self.clear();
            true
        } else {
            debug!("Stored credential changed since the request, keeping it");
            false
        }
    }

    /// Whether `token` is past its `exp` claim.
    ///
    /// A credential that cannot be decoded counts as expired. In both cases
    /// the stored credential is cleared.
    pub fn is_expired(&self, token: &str) -> bool {
        match decode_claims(token) {
            Ok(claims) if claims.is_expired() => {
                debug!(exp = ?claims.exp, "Stored credential has expired");
                self.clear();
                true
            }
            Ok(_) => false,
            Err(e) => {
                warn!(error = %e, "Discarding undecodable credential");
                self.clear();
                true
            }
        }
    }

    /// The stored credential if present and not expired
    pub fn valid_token(&self) -> Option<String> {
        self.read().filter(|token| !self.is_expired(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::tests::make_token;
    use chrono::Utc;

    fn token_expiring_in(secs: i64) -> String {
        make_token(&serde_json::json!({"sub": "1", "exp": Utc::now().timestamp() + secs}))
    }

    #[test]
    fn test_save_read_clear() {
        let store = TokenStore::in_memory();
        assert_eq!(store.read(), None);

        store.save("first").unwrap();
        store.save("second").unwrap();
        assert_eq!(store.read().as_deref(), Some("second"));

        store.clear();
        store.clear();
        assert_eq!(store.read(), None);
    }

    #[test]
    fn test_clear_if_current_keeps_newer_credential() {
        let store = TokenStore::in_memory();
        store.save("newer").unwrap();

        assert!(!store.clear_if_current("older"));
        assert_eq!(store.read().as_deref(), Some("newer"));

        assert!(store.clear_if_current("newer"));
        assert_eq!(store.read(), None);
        assert!(!store.clear_if_current("newer"));
    }

    #[test]
    fn test_expired_credential_is_cleared() {
        let store = TokenStore::in_memory();
        let token = token_expiring_in(-60);
        store.save(&token).unwrap();

        assert!(store.is_expired(&token));
        assert_eq!(store.read(), None);
    }

    #[test]
    fn test_expiring_now_counts_as_expired() {
        let store = TokenStore::in_memory();
        let token = token_expiring_in(0);
        store.save(&token).unwrap();
        assert!(store.is_expired(&token));
        assert_eq!(store.valid_token(), None);
    }

    #[test]
    fn test_credential_without_exp_stays_valid() {
        let store = TokenStore::in_memory();
        let token = make_token(&serde_json::json!({"sub": "1"}));
        store.save(&token).unwrap();

        assert!(!store.is_expired(&token));
        assert!(!store.is_expired(&token));
        assert_eq!(store.valid_token(), Some(token));
    }

    #[test]
    fn test_malformed_credential_is_cleared() {
        let store = TokenStore::in_memory();
        store.save("not-a-jwt").unwrap();

        assert!(store.is_expired("not-a-jwt"));
        assert_eq!(store.read(), None);
    }

    #[test]
    fn test_valid_token_keeps_live_credential() {
        let store = TokenStore::in_memory();
        let token = token_expiring_in(3600);
        store.save(&token).unwrap();
        assert_eq!(store.valid_token(), Some(token.clone()));
        assert_eq!(store.read(), Some(token));
    }

    #[test]
    fn test_file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested").join("credential.json"));

        assert_eq!(storage.load().unwrap(), None);
        storage.store("abc.def.ghi").unwrap();
        assert_eq!(storage.load().unwrap().as_deref(), Some("abc.def.ghi"));

        let raw = std::fs::read_to_string(storage.path()).unwrap();
        assert!(raw.contains(TOKEN_KEY));

        storage.remove().unwrap();
        storage.remove().unwrap();
        assert_eq!(storage.load().unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_storage_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("credential.json"));
        storage.store("abc.def.ghi").unwrap();
        let mode = std::fs::metadata(storage.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_corrupt_file_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credential.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = TokenStore::new(FileStorage::new(&path));
        assert_eq!(store.read(), None);
    }
}
