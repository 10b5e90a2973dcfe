use crate::{
    app::{AppError, AppResult, ParamsError},
    auth::Claims,
};
use contracts::{AddTaskParams, InvalidAddTaskParams, MessageResponse, Task, TaskList};
use database::{Task as DbTask, TaskDatabase, TaskList as DbTaskList};
use serde_json::Value as JsonValue;
use std::{convert::TryFrom, sync::Arc};

/// Task operations for the user named in the verified token claims.
/// The claims are the only source of the storage path.
pub struct TaskController {
    task_db: Arc<TaskDatabase>,
}

impl TaskController {
    pub fn new(task_db: Arc<TaskDatabase>) -> Self {
        Self { task_db }
    }

    pub async fn get_tasks(&self, claims: &Claims) -> AppResult<TaskList> {
        let task_list = self
            .task_db
            .get_tasks(&claims.username)
            .await
            .map_err(|e| AppError::from(e).with_message("Could not retrieve tasks."))?;

        Ok(TaskListWrapper::from(task_list).0)
    }

    pub async fn add_task(&self, claims: &Claims, body: JsonValue) -> AppResult<Task> {
        let params = AddTaskParams::try_from(body)?;

        let task = self
            .task_db
            .insert_task(&claims.username, &params.title)
            .await
            .map_err(|e| AppError::from(e).with_message("Could not add task."))?;

        Ok(TaskWrapper::from(task).0)
    }

    pub async fn toggle_task(&self, claims: &Claims, id: &str) -> AppResult<Task> {
        let task = self
            .task_db
            .toggle_task(&claims.username, id)
            .await
            .map_err(|e| AppError::from(e).with_message("Could not update task."))?;

        match task {
            Some(task) => Ok(TaskWrapper::from(task).0),
            None => Err(task_not_found(id)),
        }
    }

    pub async fn delete_task(&self, claims: &Claims, id: &str) -> AppResult<MessageResponse> {
        let removed = self
            .task_db
            .delete_task(&claims.username, id)
            .await
            .map_err(|e| AppError::from(e).with_message("Could not delete task."))?;

        if removed == 0 {
            return Err(task_not_found(id));
        }

        Ok(MessageResponse::new("Task deleted"))
    }
}

fn task_not_found(id: &str) -> AppError {
    AppError::not_found()
        .with_message("Task not found")
        .with_context(&format!("no task with id '{}'", id))
}

impl ParamsError for InvalidAddTaskParams {}

/// Used in order to convert from `database::Task` to `contracts::Task` (orphan rule).
struct TaskWrapper(Task);

impl From<DbTask> for TaskWrapper {
    fn from(db_task: DbTask) -> Self {
        TaskWrapper(Task::new(db_task.id, db_task.title, db_task.completed))
    }
}

struct TaskListWrapper(TaskList);

impl From<DbTaskList> for TaskListWrapper {
    fn from(db_task_list: DbTaskList) -> Self {
        TaskListWrapper(TaskList::new(
            db_task_list
                .tasks
                .into_iter()
                .map(|t| TaskWrapper::from(t).0)
                .collect(),
        ))
    }
}
