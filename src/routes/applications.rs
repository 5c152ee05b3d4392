use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{require_owner, require_role, AuthenticatedUser};
use crate::error::{AppError, AppResult};
use crate::models::{
    Application, NewApplication, APPLICATION_STATUSES, ROLE_ADMIN, ROLE_JOB_SEEKER, STATUS_PENDING,
};
use crate::schema::{applications, job_seekers};
use crate::state::AppState;
use crate::utils::respond::{self, to_iso, Envelope};

use super::job_seekers::{find_job_seeker, job_seeker_for_user};
use super::jobs::find_job;

#[derive(Deserialize)]
pub struct CreateApplicationRequest {
    pub job_id: Uuid,
    pub cv: String,
}

#[derive(Deserialize)]
pub struct CreateJobApplicationRequest {
    pub cv: String,
}

#[derive(Deserialize)]
pub struct UpdateApplicationRequest {
    pub cv: Option<String>,
    pub status: Option<String>,
    pub reject_reason: Option<String>,
    pub meeting_date: Option<DateTime<Utc>>,
}

#[derive(AsChangeset)]
#[diesel(table_name = applications)]
struct ApplicationChangeset {
    cv: Option<String>,
    status: Option<String>,
    reject_reason: Option<String>,
    meeting_date: Option<chrono::NaiveDateTime>,
}

#[derive(Serialize)]
pub struct ApplicationResponse {
    pub id: Uuid,
    pub cv: String,
    pub status: String,
    pub reject_reason: Option<String>,
    pub meeting_date: Option<String>,
    pub job_id: Uuid,
    pub job_seeker_id: Uuid,
    pub created_at: String,
}

fn to_application_response(application: Application) -> ApplicationResponse {
    ApplicationResponse {
        id: application.id,
        cv: application.cv,
        status: application.status,
        reject_reason: application.reject_reason,
        meeting_date: application.meeting_date.map(to_iso),
        job_id: application.job_id,
        job_seeker_id: application.job_seeker_id,
        created_at: to_iso(application.created_at),
    }
}

fn find_application(conn: &mut PgConnection, id: Uuid) -> AppResult<Application> {
    applications::table
        .find(id)
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::not_found(format!("application {id} not found")))
}

/// Application ownership is two hops away: application -> jobSeeker -> user.
fn application_owner_user_id(conn: &mut PgConnection, application: &Application) -> AppResult<Uuid> {
    let owner: Option<Uuid> = job_seekers::table
        .find(application.job_seeker_id)
        .select(job_seekers::user_id)
        .first(conn)
        .optional()?;
    owner.ok_or_else(|| {
        AppError::not_found(format!("jobSeeker {} not found", application.job_seeker_id))
    })
}

pub async fn list_applications(
    State(state): State<AppState>,
) -> AppResult<Json<Envelope<Vec<ApplicationResponse>>>> {
    let mut conn = state.db()?;
    let rows: Vec<Application> = applications::table
        .order(applications::created_at.desc())
        .load(&mut conn)?;
    Ok(respond::list(
        rows.into_iter().map(to_application_response).collect(),
    ))
}

pub async fn get_application(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Envelope<ApplicationResponse>>> {
    let mut conn = state.db()?;
    let application = find_application(&mut conn, id)?;
    Ok(respond::one(to_application_response(application)))
}

pub async fn list_job_applications(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> AppResult<Json<Envelope<Vec<ApplicationResponse>>>> {
    let mut conn = state.db()?;
    find_job(&mut conn, job_id)?;

    let rows: Vec<Application> = applications::table
        .filter(applications::job_id.eq(job_id))
        .order(applications::created_at.desc())
        .load(&mut conn)?;
    Ok(respond::list(
        rows.into_iter().map(to_application_response).collect(),
    ))
}

pub async fn list_job_seeker_applications(
    State(state): State<AppState>,
    Path(seeker_id): Path<Uuid>,
) -> AppResult<Json<Envelope<Vec<ApplicationResponse>>>> {
    let mut conn = state.db()?;
    find_job_seeker(&mut conn, seeker_id)?;

    let rows: Vec<Application> = applications::table
        .filter(applications::job_seeker_id.eq(seeker_id))
        .order(applications::created_at.desc())
        .load(&mut conn)?;
    Ok(respond::list(
        rows.into_iter().map(to_application_response).collect(),
    ))
}

fn insert_application(
    conn: &mut PgConnection,
    user: &AuthenticatedUser,
    job_id: Uuid,
    cv: String,
) -> AppResult<Application> {
    if cv.trim().is_empty() {
        return Err(AppError::bad_request("please add a cv"));
    }

    let seeker = job_seeker_for_user(conn, user.user_id)?;
    find_job(conn, job_id)?;

    let new_application = NewApplication {
        id: Uuid::new_v4(),
        cv,
        // Applications always start pending; status moves via updates only.
        status: STATUS_PENDING.to_string(),
        job_id,
        job_seeker_id: seeker.id,
    };

    diesel::insert_into(applications::table)
        .values(&new_application)
        .execute(conn)?;

    Ok(applications::table.find(new_application.id).first(conn)?)
}

pub async fn create_application(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateApplicationRequest>,
) -> AppResult<(StatusCode, Json<Envelope<ApplicationResponse>>)> {
    require_role(&user, &[ROLE_JOB_SEEKER, ROLE_ADMIN])?;

    let mut conn = state.db()?;
    let application = insert_application(&mut conn, &user, payload.job_id, payload.cv)?;
    Ok((
        StatusCode::CREATED,
        respond::one(to_application_response(application)),
    ))
}

pub async fn create_job_application(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateJobApplicationRequest>,
) -> AppResult<(StatusCode, Json<Envelope<ApplicationResponse>>)> {
    require_role(&user, &[ROLE_JOB_SEEKER, ROLE_ADMIN])?;

    let mut conn = state.db()?;
    let application = insert_application(&mut conn, &user, job_id, payload.cv)?;
    Ok((
        StatusCode::CREATED,
        respond::one(to_application_response(application)),
    ))
}

pub async fn update_application(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(payload): Json<UpdateApplicationRequest>,
) -> AppResult<Json<Envelope<ApplicationResponse>>> {
    let mut conn = state.db()?;
    let application = find_application(&mut conn, id)?;
    let owner = application_owner_user_id(&mut conn, &application)?;
    require_owner(&user, owner, format!("update application {id}").as_str())?;

    if let Some(status) = payload.status.as_deref() {
        if !APPLICATION_STATUSES.contains(&status) {
            return Err(AppError::bad_request(
                "status must be pending, accept or reject",
            ));
        }
    }
    if let Some(cv) = payload.cv.as_deref() {
        if cv.trim().is_empty() {
            return Err(AppError::bad_request("please add a cv"));
        }
    }

    let changeset = ApplicationChangeset {
        cv: payload.cv,
        status: payload.status,
        reject_reason: payload.reject_reason,
        meeting_date: payload.meeting_date.map(|value| value.naive_utc()),
    };

    let no_changes = changeset.cv.is_none()
        && changeset.status.is_none()
        && changeset.reject_reason.is_none()
        && changeset.meeting_date.is_none();
    if no_changes {
        return Ok(respond::one(to_application_response(application)));
    }

    diesel::update(applications::table.find(id))
        .set(&changeset)
        .execute(&mut conn)?;

    let updated: Application = applications::table.find(id).first(&mut conn)?;
    Ok(respond::one(to_application_response(updated)))
}

pub async fn delete_application(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthenticatedUser,
) -> AppResult<Json<Envelope<serde_json::Value>>> {
    let mut conn = state.db()?;
    let application = find_application(&mut conn, id)?;
    let owner = application_owner_user_id(&mut conn, &application)?;
    require_owner(&user, owner, format!("delete application {id}").as_str())?;

    diesel::delete(applications::table.find(id)).execute(&mut conn)?;

    Ok(respond::empty())
}
