//! Task routes under `/users/{user_id}/tasks`.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::state::{Db, Task, TaskRecord};

const TITLE_MAX: usize = 255;
const DESCRIPTION_MAX: usize = 2000;
const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 100;

#[derive(Deserialize)]
pub struct CreateTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct ListParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskList {
    pub tasks: Vec<Task>,
    pub total: u64,
}

/// The path user must be the session user.
fn authorize(path_user: Uuid, current: &CurrentUser) -> Result<Uuid, AppError> {
    if path_user == current.0.id {
        Ok(path_user)
    } else {
        Err(AppError::Forbidden)
    }
}

fn clean_title(title: &str) -> Result<String, AppError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::validation("title", "title must not be empty"));
    }
    if title.chars().count() > TITLE_MAX {
        return Err(AppError::validation(
            "title",
            "title must be at most 255 characters",
        ));
    }
    Ok(title.to_string())
}

fn check_description(description: Option<&str>) -> Result<(), AppError> {
    match description {
        Some(d) if d.chars().count() > DESCRIPTION_MAX => Err(AppError::validation(
            "description",
            "description must be at most 2000 characters",
        )),
        _ => Ok(()),
    }
}

pub async fn list_tasks(
    State(db): State<Db>,
    current: CurrentUser,
    Path(user_id): Path<Uuid>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<TaskList>, AppError> {
    let owner = authorize(user_id, &current)?;
    let Query(params) = params?;
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(AppError::validation("limit", "limit must be between 1 and 100"));
    }
    let offset = params.offset.unwrap_or(0) as usize;

    let store = db.read().await;
    let mut owned: Vec<&TaskRecord> = store.tasks.values().filter(|r| r.owner == owner).collect();
    owned.sort_by(|a, b| {
        b.task
            .created_at
            .cmp(&a.task.created_at)
            .then(b.seq.cmp(&a.seq))
    });
    let total = owned.len() as u64;
    let tasks = owned
        .into_iter()
        .skip(offset)
        .take(limit as usize)
        .map(|r| r.task.clone())
        .collect();
    Ok(Json(TaskList { tasks, total }))
}

pub async fn create_task(
    State(db): State<Db>,
    current: CurrentUser,
    Path(user_id): Path<Uuid>,
    payload: Result<Json<CreateTask>, JsonRejection>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    let owner = authorize(user_id, &current)?;
    let Json(input) = payload?;
    let title = clean_title(&input.title)?;
    check_description(input.description.as_deref())?;

    let now = Utc::now();
    let task = Task {
        id: Uuid::new_v4(),
        title,
        description: input.description,
        is_completed: false,
        created_at: now,
        updated_at: now,
    };
    let mut store = db.write().await;
    let seq = store.next_seq;
    store.next_seq += 1;
    store.tasks.insert(
        task.id,
        TaskRecord {
            owner,
            seq,
            task: task.clone(),
        },
    );
    debug!(task_id = %task.id, %owner, "task created");
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(
    State(db): State<Db>,
    current: CurrentUser,
    Path((user_id, task_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Task>, AppError> {
    let owner = authorize(user_id, &current)?;
    let store = db.read().await;
    store
        .tasks
        .get(&task_id)
        .filter(|r| r.owner == owner)
        .map(|r| Json(r.task.clone()))
        .ok_or(AppError::NotFound("Task not found"))
}

pub async fn update_task(
    State(db): State<Db>,
    current: CurrentUser,
    Path((user_id, task_id)): Path<(Uuid, Uuid)>,
    payload: Result<Json<UpdateTask>, JsonRejection>,
) -> Result<Json<Task>, AppError> {
    let owner = authorize(user_id, &current)?;
    let Json(input) = payload?;
    let title = input.title.as_deref().map(clean_title).transpose()?;
    check_description(input.description.as_deref())?;

    let mut store = db.write().await;
    let record = store
        .tasks
        .get_mut(&task_id)
        .filter(|r| r.owner == owner)
        .ok_or(AppError::NotFound("Task not found"))?;
    if let Some(title) = title {
        record.task.title = title;
    }
    if let Some(description) = input.description {
        record.task.description = Some(description);
    }
    record.task.updated_at = Utc::now();
    Ok(Json(record.task.clone()))
}

pub async fn toggle_complete(
    State(db): State<Db>,
    current: CurrentUser,
    Path((user_id, task_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Task>, AppError> {
    let owner = authorize(user_id, &current)?;
    let mut store = db.write().await;
    let record = store
        .tasks
        .get_mut(&task_id)
        .filter(|r| r.owner == owner)
        .ok_or(AppError::NotFound("Task not found"))?;
    record.task.is_completed = !record.task.is_completed;
    record.task.updated_at = Utc::now();
    Ok(Json(record.task.clone()))
}

pub async fn delete_task(
    State(db): State<Db>,
    current: CurrentUser,
    Path((user_id, task_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let owner = authorize(user_id, &current)?;
    let mut store = db.write().await;
    let owned = store.tasks.get(&task_id).is_some_and(|r| r.owner == owner);
    if !owned {
        return Err(AppError::NotFound("Task not found"));
    }
    store.tasks.remove(&task_id);
    debug!(%task_id, "task deleted");
    Ok(StatusCode::NO_CONTENT)
}
