use axum::{
    extract::{Path, State},
    Json,
};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::{require_owner, AuthenticatedUser};
use crate::error::{AppError, AppResult};
use crate::models::Notification;
use crate::schema::{job_seekers, notifications};
use crate::state::AppState;
use crate::utils::respond::{self, to_iso, Envelope};

use super::job_seekers::find_job_seeker;

#[derive(Serialize)]
pub struct NotificationResponse {
    pub id: Uuid,
    pub job_seeker_id: Uuid,
    pub job_id: Uuid,
    pub created_at: String,
}

fn to_notification_response(notification: Notification) -> NotificationResponse {
    NotificationResponse {
        id: notification.id,
        job_seeker_id: notification.job_seeker_id,
        job_id: notification.job_id,
        created_at: to_iso(notification.created_at),
    }
}

fn find_notification(conn: &mut PgConnection, id: Uuid) -> AppResult<Notification> {
    notifications::table
        .find(id)
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::not_found(format!("notification {id} not found")))
}

fn notification_owner_user_id(
    conn: &mut PgConnection,
    notification: &Notification,
) -> AppResult<Uuid> {
    let owner: Option<Uuid> = job_seekers::table
        .find(notification.job_seeker_id)
        .select(job_seekers::user_id)
        .first(conn)
        .optional()?;
    owner.ok_or_else(|| {
        AppError::not_found(format!("jobSeeker {} not found", notification.job_seeker_id))
    })
}

pub async fn list_notifications(
    State(state): State<AppState>,
) -> AppResult<Json<Envelope<Vec<NotificationResponse>>>> {
    let mut conn = state.db()?;
    let rows: Vec<Notification> = notifications::table
        .order(notifications::created_at.desc())
        .load(&mut conn)?;
    Ok(respond::list(
        rows.into_iter().map(to_notification_response).collect(),
    ))
}

pub async fn list_job_seeker_notifications(
    State(state): State<AppState>,
    Path(seeker_id): Path<Uuid>,
) -> AppResult<Json<Envelope<Vec<NotificationResponse>>>> {
    let mut conn = state.db()?;
    find_job_seeker(&mut conn, seeker_id)?;

    let rows: Vec<Notification> = notifications::table
        .filter(notifications::job_seeker_id.eq(seeker_id))
        .order(notifications::created_at.desc())
        .load(&mut conn)?;
    Ok(respond::list(
        rows.into_iter().map(to_notification_response).collect(),
    ))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthenticatedUser,
) -> AppResult<Json<Envelope<serde_json::Value>>> {
    let mut conn = state.db()?;
    let notification = find_notification(&mut conn, id)?;
    let owner = notification_owner_user_id(&mut conn, &notification)?;
    require_owner(&user, owner, format!("delete notification {id}").as_str())?;

    diesel::delete(notifications::table.find(id)).execute(&mut conn)?;

    Ok(respond::empty())
}
