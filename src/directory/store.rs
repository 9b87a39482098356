//! User directory store
//!
//! Read-mostly store of user account records, kept in memory and optionally
//! persisted to a JSON file. Loaded once at startup and rewritten after
//! every mutation; password hashes never appear in the public projection.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

/// Errors that can occur during directory operations
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Failed to read directory file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse directory file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A stored user account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Stable user id; doubles as the signaling identity in clients
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// Argon2id PHC hash
    pub password_hash: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Projection of a user record safe to return from the API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&UserRecord> for PublicUser {
    fn from(record: &UserRecord) -> Self {
        Self {
            id: record.id,
            username: record.username.clone(),
            email: record.email.clone(),
            avatar_url: record.avatar_url.clone(),
            created_at: record.created_at,
        }
    }
}

/// On-disk shape of the directory file
#[derive(Debug, Default, Serialize, Deserialize)]
struct DirectoryFile {
    #[serde(default)]
    users: Vec<UserRecord>,
}

/// The user directory
///
/// Unrelated to the live presence registry; this is the durable account
/// store behind the HTTP API.
pub struct UserDirectory {
    path: Option<PathBuf>,
    users: RwLock<HashMap<Uuid, UserRecord>>,
}

impl UserDirectory {
    /// Create an in-memory directory with no persistence
    pub fn new() -> Self {
        Self {
            path: None,
            users: RwLock::new(HashMap::new()),
        }
    }

    /// Open a directory backed by a JSON file
    ///
    /// Starts empty when the file does not exist yet.
    pub fn with_file(path: impl Into<PathBuf>) -> Result<Self, DirectoryError> {
        let path = path.into();
        let users = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let file: DirectoryFile = serde_json::from_str(&content)?;
            file.users.into_iter().map(|u| (u.id, u)).collect()
        } else {
            HashMap::new()
        };

        info!(path = %path.display(), "User directory loaded");
        Ok(Self {
            path: Some(path),
            users: RwLock::new(users),
        })
    }

    /// Create a new user account
    ///
    /// Emails are compared case-insensitively; a duplicate is rejected.
    pub async fn create(
        &self,
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Result<PublicUser, DirectoryError> {
        let username = username.into();
        let email = email.into();
        let mut users = self.users.write().await;

        if users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&email))
        {
            return Err(DirectoryError::DuplicateEmail);
        }

        let record = UserRecord {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash: password_hash.into(),
            avatar_url: None,
            created_at: Utc::now(),
        };
        let public = PublicUser::from(&record);
        users.insert(record.id, record);

        self.persist(&users)?;
        info!(user_id = %public.id, username = %public.username, "User created");
        Ok(public)
    }

    /// Look up the full record for an email address
    ///
    /// Returns the stored record including the password hash; only the
    /// login flow uses this.
    pub async fn find_by_email(&self, email: &str) -> Option<UserRecord> {
        self.users
            .read()
            .await
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned()
    }

    /// Get the public record for a user id
    pub async fn get(&self, id: Uuid) -> Option<PublicUser> {
        self.users.read().await.get(&id).map(PublicUser::from)
    }

    /// List all users, ordered by username
    pub async fn list(&self) -> Vec<PublicUser> {
        let users = self.users.read().await;
        let mut listed: Vec<PublicUser> = users.values().map(PublicUser::from).collect();
        listed.sort_by(|a, b| a.username.cmp(&b.username));
        listed
    }

    /// Number of stored accounts
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    fn persist(&self, users: &HashMap<Uuid, UserRecord>) -> Result<(), DirectoryError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = DirectoryFile {
            users: users.values().cloned().collect(),
        };
        let content = serde_json::to_string_pretty(&file)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl Default for UserDirectory {
    fn default() -> Self {
        Self::new()
    }
}
