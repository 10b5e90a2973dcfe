//! File-backed storage for users and their task lists.
//!
//! Every user owns one directory under the data root, named by their
//! normalized username:
//!
//! ```text
//! <data root>/
//!   alice1/
//!     profile.json    {"username": "alice1", "hashedPassword": "$2b$10$..."}
//!     tasks.json      {"tasks": [{"id": "task_1700000000000",
//!                                 "title": "...", "completed": false}]}
//! ```
//!
//! Documents are always read and rewritten whole.

use serde::{de::DeserializeOwned, Serialize};
use std::{
    collections::HashMap,
    fmt::{Debug, Display},
    io,
    marker::PhantomData,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
    time,
};
use tokio::{fs, sync::OwnedMutexGuard};

#[macro_use]
extern crate log;

mod task;
mod user;

pub use task::*;
pub use user::*;

pub type DatabaseResult<T> = Result<T, DatabaseError>;

pub struct Database<T> {
    root: PathBuf,
    locks: Arc<UserLocks>,
    _phantom: PhantomData<T>,
}

impl<T> Database<T> {
    /// Opens a store rooted at `root`, creating the directory if needed.
    pub async fn open<P>(root: P) -> DatabaseResult<Self>
    where
        P: Into<PathBuf>,
    {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        trace!("opened data directory at '{}'", root.display());
        Ok(Self {
            root,
            locks: Arc::default(),
            _phantom: PhantomData,
        })
    }

    /// A handle for another record kind over the same root. Both handles
    /// take the same per-user locks.
    pub fn share<U>(&self) -> Database<U> {
        Database {
            root: self.root.clone(),
            locks: Arc::clone(&self.locks),
            _phantom: PhantomData,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn user_dir(&self, username: &str) -> DatabaseResult<PathBuf> {
        if username.is_empty()
            || !username
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            return Err(DatabaseError::InvalidUsername(username.to_owned()));
        }
        Ok(self.root.join(username))
    }

    /// Held for the whole of a read-modify-write cycle on one user's files.
    async fn lock_user(&self, username: &str) -> OwnedMutexGuard<()> {
        self.locks.get(username).lock_owned().await
    }
}

/// One async mutex per username, created on first use. Entries nobody
/// holds or waits on are dropped the next time a lock is handed out.
#[derive(Default)]
struct UserLocks(Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>);

impl UserLocks {
    fn get(&self, username: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        locks.retain(|name, lock| name == username || Arc::strong_count(lock) > 1);
        locks.entry(username.to_owned()).or_default().clone()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[derive(Debug)]
pub enum DatabaseError {
    Io(io::Error),
    Serde(serde_json::Error),
    Hash(bcrypt::BcryptError),
    Join(tokio::task::JoinError),
    InvalidUsername(String),
}

impl From<io::Error> for DatabaseError {
    fn from(io_error: io::Error) -> Self {
        DatabaseError::Io(io_error)
    }
}

impl From<serde_json::Error> for DatabaseError {
    fn from(serde_error: serde_json::Error) -> Self {
        DatabaseError::Serde(serde_error)
    }
}

impl From<bcrypt::BcryptError> for DatabaseError {
    fn from(bcrypt_error: bcrypt::BcryptError) -> Self {
        DatabaseError::Hash(bcrypt_error)
    }
}

impl From<tokio::task::JoinError> for DatabaseError {
    fn from(join_error: tokio::task::JoinError) -> Self {
        DatabaseError::Join(join_error)
    }
}

impl DatabaseError {
    /// Whether the error means the requested document does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DatabaseError::Io(e) if e.kind() == io::ErrorKind::NotFound)
    }
}

impl Display for DatabaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let output = match self {
            DatabaseError::Io(e) => e.to_string(),
            DatabaseError::Serde(e) => e.to_string(),
            DatabaseError::Hash(e) => e.to_string(),
            DatabaseError::Join(e) => e.to_string(),
            DatabaseError::InvalidUsername(username) => {
                format!("invalid storage username: '{}'", username)
            }
        };

        write!(f, "{}", output)
    }
}

impl std::error::Error for DatabaseError {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertionResult {
    Inserted,
    AlreadyExists,
}

async fn read_json<T>(path: &Path) -> DatabaseResult<T>
where
    T: DeserializeOwned + Debug,
{
    let timer = time::Instant::now();
    let bytes = fs::read(path).await?;
    let value = match serde_json::from_slice::<T>(&bytes) {
        Ok(ok) => ok,
        Err(err) => {
            error!(
                "failed to parse object of type '{}' from '{}' with error '{:?}'",
                std::any::type_name::<T>(),
                path.display(),
                err
            );
            return Err(err.into());
        }
    };
    trace!(
        "read '{:?}' from '{}' in {:?}",
        value,
        path.display(),
        timer.elapsed()
    );
    Ok(value)
}

async fn write_json<T>(path: &Path, value: &T, pretty: bool) -> DatabaseResult<()>
where
    T: Serialize,
{
    let bytes = if pretty {
        serde_json::to_vec_pretty(value)?
    } else {
        serde_json::to_vec(value)?
    };
    fs::write(path, bytes).await?;
    trace!("wrote '{}'", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_creates_root_test() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested").join("data");

        let db = Database::<Profile>::open(&root).await.unwrap();

        assert!(root.is_dir());
        assert_eq!(db.root(), root.as_path());
    }

    #[tokio::test]
    async fn user_dir_rejects_unnormalized_names_test() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::<Profile>::open(dir.path()).await.unwrap();

        for bad in &["", "..", "Alice", "a/b", "bob.json"] {
            assert!(matches!(
                db.user_dir(bad),
                Err(DatabaseError::InvalidUsername(_))
            ));
        }
        assert_eq!(db.user_dir("alice1").unwrap(), dir.path().join("alice1"));
    }

    #[tokio::test]
    async fn shared_handles_use_one_lock_test() {
        let dir = tempfile::tempdir().unwrap();
        let users = Database::<Profile>::open(dir.path()).await.unwrap();
        let tasks: Database<TaskList> = users.share();
        assert_eq!(tasks.root(), users.root());

        let guard = users.lock_user("alice").await;
        assert!(tasks.locks.get("alice").try_lock().is_err());
        assert!(tasks.locks.get("bob").try_lock().is_ok());
        drop(guard);
        assert!(tasks.locks.get("alice").try_lock().is_ok());
    }

    #[tokio::test]
    async fn idle_locks_are_pruned_test() {
        let locks = UserLocks::default();

        let held = locks.get("alice").lock_owned().await;
        for name in &["bob", "carol", "dave"] {
            drop(locks.get(name).lock_owned().await);
        }
        // alice is still held, dave was handed out last
        assert_eq!(locks.len(), 2);

        drop(held);
        drop(locks.get("erin"));
        assert_eq!(locks.len(), 1);
    }

    #[test]
    fn not_found_test() {
        let error = DatabaseError::from(io::Error::from(io::ErrorKind::NotFound));
        assert!(error.is_not_found());
        let error = DatabaseError::from(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(!error.is_not_found());
    }
}
