//! Per-user session state: the auth token, the cached library and the
//! profile. Passed explicitly to whatever needs it.

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};

use crate::{error::ApiError, library::LibraryCache, model::Profile};

#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Option<String>,
    profile: Option<Profile>,
    library: LibraryCache,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Default::default()
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Start a new session with a fresh token. Anything cached for a
    /// previous user is dropped.
    pub fn login(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
        self.profile = None;
        self.library.invalidate();
    }

    pub fn logout(&mut self) {
        tracing::info!("Ending session");
        self.token = None;
        self.profile = None;
        self.library.invalidate();
    }

    /// End the session when the service rejected the token.
    /// Returns true if the session was ended.
    pub fn handle_error(&mut self, error: &ApiError) -> bool {
        if error.is_unauthorized() {
            tracing::warn!("Token rejected by the service, logging out");
            self.logout();
            true
        } else {
            false
        }
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn set_profile(&mut self, profile: Profile) {
        self.profile = Some(profile);
    }

    pub fn is_admin(&self) -> bool {
        self.profile.as_ref().is_some_and(Profile::is_admin)
    }

    pub fn library(&self) -> &LibraryCache {
        &self.library
    }

    pub fn library_mut(&mut self) -> &mut LibraryCache {
        &mut self.library
    }
}

// ==================== Token Storage ====================

/// Persists the session token between runs of the binary.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Read the stored token. A missing or blank file means no token.
    pub fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read token file {}", self.path.display()))?;
        let token = raw.trim();
        Ok((!token.is_empty()).then(|| token.to_string()))
    }

    pub fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&self.path, token)
            .with_context(|| format!("Failed to write token file {}", self.path.display()))?;
        tracing::debug!("Saved token to {}", self.path.display());
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove token file {}", self.path.display()))?;
        }
        Ok(())
    }

    /// Open a session from the stored token, if any.
    pub fn restore_session(&self) -> Result<Session> {
        Ok(match self.load()? {
            Some(token) => Session::with_token(token),
            None => Session::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::model::{LibraryPlant, Role};

    fn profile(role: Role) -> Profile {
        Profile {
            id: 1,
            username: "ann".to_string(),
            email: "ann@example.com".to_string(),
            first_name: "Ann".to_string(),
            last_name: "Lee".to_string(),
            role,
        }
    }

    fn library() -> Vec<LibraryPlant> {
        vec![LibraryPlant {
            id: 1,
            name: "Fern".to_string(),
            description: String::new(),
            watering_interval_days: 4,
            light_preference: Default::default(),
            care_difficulty: Default::default(),
            image_url: None,
            created_at: None,
        }]
    }

    // ==================== Session Tests ====================

    #[test]
    fn test_new_session_is_anonymous() {
        let session = Session::new();
        assert!(!session.is_authenticated());
        assert!(session.token().is_none());
        assert!(!session.is_admin());
    }

    #[test]
    fn test_logout_clears_token_and_cache() {
        let mut session = Session::with_token("abc");
        session.library_mut().populate(library());
        session.set_profile(profile(Role::Admin));
        assert!(session.is_admin());

        session.logout();

        assert!(!session.is_authenticated());
        assert!(!session.library().is_populated());
        assert!(session.profile().is_none());
    }

    #[test]
    fn test_login_replaces_previous_user_state() {
        let mut session = Session::with_token("old");
        session.library_mut().populate(library());

        session.login("new");

        assert_eq!(session.token(), Some("new"));
        assert!(!session.library().is_populated());
    }

    #[test]
    fn test_unauthorized_error_ends_session() {
        let mut session = Session::with_token("abc");
        assert!(!session.handle_error(&ApiError::NotFound("/plants/1".to_string())));
        assert!(session.is_authenticated());

        assert!(session.handle_error(&ApiError::Unauthorized));
        assert!(!session.is_authenticated());
    }

    // ==================== Token Store Tests ====================

    #[test]
    fn test_token_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = TokenStore::new(dir.path().join("nested/token"));

        assert_eq!(store.load().unwrap(), None);

        store.save("secret-token").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("secret-token"));

        let session = store.restore_session().unwrap();
        assert_eq!(session.token(), Some("secret-token"));

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
        assert!(!store.restore_session().unwrap().is_authenticated());
    }

    #[test]
    fn test_blank_token_file_is_no_token() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token");
        fs::write(&path, "  \n").unwrap();

        let store = TokenStore::new(path);
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_clear_missing_file_is_ok() {
        let dir = TempDir::new().unwrap();
        let store = TokenStore::new(dir.path().join("token"));
        assert!(store.clear().is_ok());
    }
}
