use crate::{Database, DatabaseResult};
use chrono::Utc;
use std::path::PathBuf;

pub type TaskDatabase = Database<TaskList>;

pub(crate) const TASKS_FILE: &str = "tasks.json";

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[non_exhaustive]
pub struct Task {
    pub id: String,
    pub title: String,
    pub completed: bool,
}

impl Task {
    fn new(id: String, title: String) -> Self {
        Self {
            id,
            title,
            completed: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[non_exhaustive]
pub struct TaskList {
    pub tasks: Vec<Task>,
}

impl TaskList {
    pub fn empty() -> Self {
        Self { tasks: Vec::new() }
    }
}

impl TaskDatabase {
    fn tasks_path(&self, username: &str) -> DatabaseResult<PathBuf> {
        Ok(self.user_dir(username)?.join(TASKS_FILE))
    }

    pub async fn get_tasks(&self, username: &str) -> DatabaseResult<TaskList> {
        let path = self.tasks_path(username)?;
        let _guard = self.lock_user(username).await;
        crate::read_json(&path).await
    }

    /// Appends a new, uncompleted task to the end of the user's list.
    pub async fn insert_task(&self, username: &str, title: &str) -> DatabaseResult<Task> {
        let path = self.tasks_path(username)?;
        let _guard = self.lock_user(username).await;

        let mut task_list: TaskList = crate::read_json(&path).await?;
        let id = next_task_id(&task_list.tasks, Utc::now().timestamp_millis());
        let task = Task::new(id, title.to_owned());
        task_list.tasks.push(task.clone());
        crate::write_json(&path, &task_list, true).await?;

        info!("added task '{}' for user '{}'", task.id, username);
        Ok(task)
    }

    /// Flips `completed` on the first task with `id`. `None` if there is no such task.
    pub async fn toggle_task(&self, username: &str, id: &str) -> DatabaseResult<Option<Task>> {
        let path = self.tasks_path(username)?;
        let _guard = self.lock_user(username).await;

        let mut task_list: TaskList = crate::read_json(&path).await?;
        let task = match task_list.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                task.completed = !task.completed;
                task.clone()
            }
            None => return Ok(None),
        };
        crate::write_json(&path, &task_list, true).await?;

        Ok(Some(task))
    }

    /// Removes every task with `id` and returns how many were removed.
    /// Nothing is written when no task matched.
    pub async fn delete_task(&self, username: &str, id: &str) -> DatabaseResult<usize> {
        let path = self.tasks_path(username)?;
        let _guard = self.lock_user(username).await;

        let mut task_list: TaskList = crate::read_json(&path).await?;
        let original_len = task_list.tasks.len();
        task_list.tasks.retain(|t| t.id != id);
        let removed = original_len - task_list.tasks.len();

        if removed > 0 {
            crate::write_json(&path, &task_list, true).await?;
            info!(
                "deleted {} task(s) with id '{}' for user '{}'",
                removed, id, username
            );
        }

        Ok(removed)
    }
}

/// `task_<millis>`, bumped forward until it collides with no existing id.
fn next_task_id(tasks: &[Task], now_ms: i64) -> String {
    let mut stamp = now_ms;
    loop {
        let id = format!("task_{}", stamp);
        if tasks.iter().all(|t| t.id != id) {
            return id;
        }
        stamp += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UserDatabase;
    use std::{collections::HashSet, sync::Arc};
    use tempfile::TempDir;

    async fn setup(username: &str) -> (TempDir, TaskDatabase) {
        let dir = tempfile::tempdir().unwrap();
        let users = UserDatabase::open(dir.path()).await.unwrap();
        users.insert_user(username, "password").await.unwrap();
        let tasks = TaskDatabase::open(dir.path()).await.unwrap();
        (dir, tasks)
    }

    #[test]
    fn next_task_id_test() {
        assert_eq!(next_task_id(&[], 1000), "task_1000");

        let existing = vec![
            Task::new("task_1000".to_string(), "a".to_string()),
            Task::new("task_1001".to_string(), "b".to_string()),
        ];
        assert_eq!(next_task_id(&existing, 1000), "task_1002");
        assert_eq!(next_task_id(&existing, 999), "task_999");
    }

    #[tokio::test]
    async fn insert_task_test() {
        let (_dir, db) = setup("alice").await;

        let first = db.insert_task("alice", "buy milk").await.unwrap();
        let second = db.insert_task("alice", "").await.unwrap();
        let third = db.insert_task("alice", "buy milk").await.unwrap();

        assert!(!first.completed);
        assert_eq!(second.title, "");

        let list = db.get_tasks("alice").await.unwrap();
        assert_eq!(list.tasks, vec![first, second, third]);

        let ids: HashSet<_> = list.tasks.iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids.len(), 3);
    }

    #[tokio::test]
    async fn toggle_task_test() {
        let (_dir, db) = setup("alice").await;
        let task = db.insert_task("alice", "walk dog").await.unwrap();

        let toggled = db.toggle_task("alice", &task.id).await.unwrap().unwrap();
        assert!(toggled.completed);
        assert_eq!(toggled.id, task.id);

        let toggled = db.toggle_task("alice", &task.id).await.unwrap().unwrap();
        assert!(!toggled.completed);

        assert!(db.toggle_task("alice", "task_0").await.unwrap().is_none());
        assert_eq!(db.get_tasks("alice").await.unwrap().tasks, vec![toggled]);
    }

    #[tokio::test]
    async fn delete_task_test() {
        let (_dir, db) = setup("alice").await;
        let keep = db.insert_task("alice", "keep").await.unwrap();
        let remove = db.insert_task("alice", "remove").await.unwrap();

        assert_eq!(db.delete_task("alice", &remove.id).await.unwrap(), 1);
        assert_eq!(db.delete_task("alice", &remove.id).await.unwrap(), 0);
        assert_eq!(db.get_tasks("alice").await.unwrap().tasks, vec![keep]);
    }

    #[tokio::test]
    async fn delete_removes_all_duplicates_test() {
        let (dir, db) = setup("alice").await;
        std::fs::write(
            dir.path().join("alice").join(TASKS_FILE),
            r#"{"tasks": [
                {"id": "task_1", "title": "a", "completed": false},
                {"id": "task_2", "title": "b", "completed": true},
                {"id": "task_1", "title": "c", "completed": true}
            ]}"#,
        )
        .unwrap();

        let toggled = db.toggle_task("alice", "task_1").await.unwrap().unwrap();
        assert_eq!(toggled.title, "a");
        assert!(toggled.completed);

        assert_eq!(db.delete_task("alice", "task_1").await.unwrap(), 2);
        let remaining = db.get_tasks("alice").await.unwrap().tasks;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "task_2");
    }

    #[tokio::test]
    async fn missing_or_corrupt_list_test() {
        let (dir, db) = setup("alice").await;

        assert!(db.get_tasks("nobody").await.unwrap_err().is_not_found());
        assert!(db.insert_task("nobody", "x").await.is_err());

        std::fs::write(dir.path().join("alice").join(TASKS_FILE), b"[oops").unwrap();
        assert!(db.get_tasks("alice").await.is_err());
    }

    #[tokio::test]
    async fn concurrent_inserts_are_not_lost_test() {
        let (_dir, db) = setup("alice").await;
        let db = Arc::new(db);

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let db = db.clone();
                tokio::spawn(async move { db.insert_task("alice", &format!("task {}", i)).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let list = db.get_tasks("alice").await.unwrap();
        assert_eq!(list.tasks.len(), 20);
        let ids: HashSet<_> = list.tasks.iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids.len(), 20);
    }
}
