use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{require_owner, AuthenticatedUser};
use crate::error::{AppError, AppResult};
use crate::models::{Alert, NewAlert};
use crate::schema::{alerts, job_seekers};
use crate::state::AppState;
use crate::utils::respond::{self, to_iso, Envelope};

use super::job_seekers::{find_job_seeker, job_seeker_for_user};

#[derive(Deserialize)]
pub struct CreateAlertRequest {
    pub title: String,
}

#[derive(Serialize)]
pub struct AlertResponse {
    pub id: Uuid,
    pub title: String,
    pub job_seeker_id: Uuid,
    pub created_at: String,
}

fn to_alert_response(alert: Alert) -> AlertResponse {
    AlertResponse {
        id: alert.id,
        title: alert.title,
        job_seeker_id: alert.job_seeker_id,
        created_at: to_iso(alert.created_at),
    }
}

fn find_alert(conn: &mut PgConnection, id: Uuid) -> AppResult<Alert> {
    alerts::table
        .find(id)
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::not_found(format!("alert {id} not found")))
}

fn alert_owner_user_id(conn: &mut PgConnection, alert: &Alert) -> AppResult<Uuid> {
    let owner: Option<Uuid> = job_seekers::table
        .find(alert.job_seeker_id)
        .select(job_seekers::user_id)
        .first(conn)
        .optional()?;
    owner.ok_or_else(|| AppError::not_found(format!("jobSeeker {} not found", alert.job_seeker_id)))
}

pub async fn list_alerts(
    State(state): State<AppState>,
) -> AppResult<Json<Envelope<Vec<AlertResponse>>>> {
    let mut conn = state.db()?;
    let rows: Vec<Alert> = alerts::table.order(alerts::created_at.desc()).load(&mut conn)?;
    Ok(respond::list(rows.into_iter().map(to_alert_response).collect()))
}

pub async fn list_job_seeker_alerts(
    State(state): State<AppState>,
    Path(seeker_id): Path<Uuid>,
) -> AppResult<Json<Envelope<Vec<AlertResponse>>>> {
    let mut conn = state.db()?;
    find_job_seeker(&mut conn, seeker_id)?;

    let rows: Vec<Alert> = alerts::table
        .filter(alerts::job_seeker_id.eq(seeker_id))
        .order(alerts::created_at.desc())
        .load(&mut conn)?;
    Ok(respond::list(rows.into_iter().map(to_alert_response).collect()))
}

pub async fn create_alert(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateAlertRequest>,
) -> AppResult<(StatusCode, Json<Envelope<AlertResponse>>)> {
    let title = payload.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::bad_request("please add an alert title"));
    }

    let mut conn = state.db()?;
    let seeker = job_seeker_for_user(&mut conn, user.user_id)?;

    let new_alert = NewAlert {
        id: Uuid::new_v4(),
        title,
        job_seeker_id: seeker.id,
    };

    diesel::insert_into(alerts::table)
        .values(&new_alert)
        .execute(&mut conn)?;

    let alert: Alert = alerts::table.find(new_alert.id).first(&mut conn)?;
    Ok((StatusCode::CREATED, respond::one(to_alert_response(alert))))
}

pub async fn delete_alert(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthenticatedUser,
) -> AppResult<Json<Envelope<serde_json::Value>>> {
    let mut conn = state.db()?;
    let alert = find_alert(&mut conn, id)?;
    let owner = alert_owner_user_id(&mut conn, &alert)?;
    require_owner(&user, owner, format!("delete alert {id}").as_str())?;

    diesel::delete(alerts::table.find(id)).execute(&mut conn)?;

    Ok(respond::empty())
}
