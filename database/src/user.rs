use crate::{Database, DatabaseResult, InsertionResult, TaskList};
use std::{io, path::Path};
use tokio::{fs, task};

pub type UserDatabase = Database<Profile>;

pub(crate) const PROFILE_FILE: &str = "profile.json";

/// bcrypt work factor used for new password hashes.
pub const PASSWORD_HASH_COST: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[non_exhaustive]
pub struct Profile {
    pub username: String,
    #[serde(rename = "hashedPassword")]
    pub hashed_password: String,
}

impl Profile {
    fn new(username: String, hashed_password: String) -> Self {
        Self {
            username,
            hashed_password,
        }
    }
}

impl UserDatabase {
    /// Creates the user's directory with a profile and an empty task list.
    ///
    /// `username` must already be normalized.
    pub async fn insert_user(
        &self,
        username: &str,
        password: &str,
    ) -> DatabaseResult<InsertionResult> {
        let user_dir = self.user_dir(username)?;
        let _guard = self.lock_user(username).await;

        if fs::metadata(&user_dir).await.is_ok() {
            return Ok(InsertionResult::AlreadyExists);
        }

        let hashed_password = hash_password(password.to_owned()).await?;

        match fs::create_dir(&user_dir).await {
            Ok(()) => (),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Ok(InsertionResult::AlreadyExists)
            }
            Err(e) => return Err(e.into()),
        }

        let profile = Profile::new(username.to_owned(), hashed_password);
        if let Err(e) = write_user_files(&user_dir, &profile).await {
            error!(
                "failed to initialize files for user '{}', removing '{}'",
                username,
                user_dir.display()
            );
            if let Err(cleanup_error) = fs::remove_dir_all(&user_dir).await {
                error!(
                    "failed to remove '{}' with error: '{}'",
                    user_dir.display(),
                    cleanup_error
                );
            }
            return Err(e);
        }

        info!("registered user '{}'", username);
        Ok(InsertionResult::Inserted)
    }

    pub async fn get_profile(&self, username: &str) -> DatabaseResult<Profile> {
        let user_dir = self.user_dir(username)?;
        crate::read_json(&user_dir.join(PROFILE_FILE)).await
    }

    /// Returns the profile if the user exists and `password` matches its hash.
    ///
    /// A missing user is `Ok(None)`, the same as a wrong password. An unreadable
    /// or corrupt profile is an error.
    pub async fn validate_user(
        &self,
        username: &str,
        password: &str,
    ) -> DatabaseResult<Option<Profile>> {
        let profile = match self.get_profile(username).await {
            Ok(profile) => profile,
            Err(e) if e.is_not_found() => {
                trace!("no profile for user '{}'", username);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let hash = profile.hashed_password.clone();
        let password = password.to_owned();
        let valid = task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??;

        Ok(if valid { Some(profile) } else { None })
    }
}

async fn write_user_files(user_dir: &Path, profile: &Profile) -> DatabaseResult<()> {
    crate::write_json(&user_dir.join(PROFILE_FILE), profile, false).await?;
    let tasks_path = user_dir.join(crate::task::TASKS_FILE);
    crate::write_json(&tasks_path, &TaskList::empty(), false).await
}

async fn hash_password(password: String) -> DatabaseResult<String> {
    let hashed = task::spawn_blocking(move || bcrypt::hash(password, PASSWORD_HASH_COST)).await??;
    Ok(hashed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TaskDatabase;

    #[tokio::test]
    async fn insert_user_test() {
        let dir = tempfile::tempdir().unwrap();
        let users = UserDatabase::open(dir.path()).await.unwrap();

        let result = users.insert_user("alice1", "hunter2").await.unwrap();
        assert_eq!(result, InsertionResult::Inserted);

        let profile = users.get_profile("alice1").await.unwrap();
        assert_eq!(profile.username, "alice1");
        assert_ne!(profile.hashed_password, "hunter2");
        assert!(bcrypt::verify("hunter2", &profile.hashed_password).unwrap());

        let raw = std::fs::read_to_string(dir.path().join("alice1").join(PROFILE_FILE)).unwrap();
        let raw: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(raw["username"], "alice1");
        assert!(raw["hashedPassword"].is_string());

        let tasks = TaskDatabase::open(dir.path()).await.unwrap();
        assert!(tasks.get_tasks("alice1").await.unwrap().tasks.is_empty());
    }

    #[tokio::test]
    async fn insert_existing_user_test() {
        let dir = tempfile::tempdir().unwrap();
        let users = UserDatabase::open(dir.path()).await.unwrap();

        assert_eq!(
            users.insert_user("bob", "first").await.unwrap(),
            InsertionResult::Inserted
        );
        assert_eq!(
            users.insert_user("bob", "second").await.unwrap(),
            InsertionResult::AlreadyExists
        );
        assert!(users.validate_user("bob", "first").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn validate_user_test() {
        let dir = tempfile::tempdir().unwrap();
        let users = UserDatabase::open(dir.path()).await.unwrap();
        users.insert_user("carol", "correct").await.unwrap();

        let profile = users.validate_user("carol", "correct").await.unwrap();
        assert_eq!(profile.map(|p| p.username), Some("carol".to_string()));

        assert!(users.validate_user("carol", "wrong").await.unwrap().is_none());
        assert!(users.validate_user("nobody", "correct").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn validate_corrupt_profile_test() {
        let dir = tempfile::tempdir().unwrap();
        let users = UserDatabase::open(dir.path()).await.unwrap();
        std::fs::create_dir(dir.path().join("dave")).unwrap();
        std::fs::write(dir.path().join("dave").join(PROFILE_FILE), b"{not json").unwrap();

        assert!(users.validate_user("dave", "whatever").await.is_err());
    }
}
