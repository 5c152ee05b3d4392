use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use crate::auth::{require_owner, AuthenticatedUser};
use crate::error::{AppError, AppResult};
use crate::models::{Job, NewJob, JOB_TYPES, JOB_TYPE_FULL_TIME};
use crate::notify;
use crate::schema::{job_providers, jobs};
use crate::state::AppState;
use crate::utils::respond::{self, to_iso, Envelope};

use super::job_providers::find_job_provider;

#[derive(Deserialize)]
pub struct CreateJobRequest {
    pub job_provider_id: Uuid,
    pub title: String,
    pub salary: i64,
    pub deadline: DateTime<Utc>,
    pub job_type: Option<String>,
    pub description: String,
    pub qualifications: String,
}

#[derive(Deserialize)]
pub struct CreateProviderJobRequest {
    pub title: String,
    pub salary: i64,
    pub deadline: DateTime<Utc>,
    pub job_type: Option<String>,
    pub description: String,
    pub qualifications: String,
}

#[derive(Deserialize)]
pub struct UpdateJobRequest {
    pub title: Option<String>,
    pub salary: Option<i64>,
    pub deadline: Option<DateTime<Utc>>,
    pub job_type: Option<String>,
    pub description: Option<String>,
    pub qualifications: Option<String>,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = jobs)]
struct JobChangeset {
    title: Option<String>,
    salary: Option<i64>,
    deadline: Option<chrono::NaiveDateTime>,
    job_type: Option<String>,
    description: Option<String>,
    qualifications: Option<String>,
}

#[derive(Serialize)]
pub struct JobResponse {
    pub id: Uuid,
    pub title: String,
    pub salary: i64,
    pub deadline: String,
    pub job_type: String,
    pub description: String,
    pub qualifications: String,
    pub job_provider_id: Uuid,
    pub created_at: String,
}

pub(super) fn to_job_response(job: Job) -> JobResponse {
    JobResponse {
        id: job.id,
        title: job.title,
        salary: job.salary,
        deadline: to_iso(job.deadline),
        job_type: job.job_type,
        description: job.description,
        qualifications: job.qualifications,
        job_provider_id: job.job_provider_id,
        created_at: to_iso(job.created_at),
    }
}

pub(super) fn find_job(conn: &mut PgConnection, id: Uuid) -> AppResult<Job> {
    jobs::table
        .find(id)
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::not_found(format!("job {id} not found")))
}

/// Job ownership is two hops away: job -> jobProvider -> user.
fn job_owner_user_id(conn: &mut PgConnection, job: &Job) -> AppResult<Uuid> {
    let owner: Option<Uuid> = job_providers::table
        .find(job.job_provider_id)
        .select(job_providers::user_id)
        .first(conn)
        .optional()?;
    owner.ok_or_else(|| {
        AppError::not_found(format!("jobProvider {} not found", job.job_provider_id))
    })
}

fn validate_job_fields(
    title: Option<&str>,
    salary: Option<i64>,
    job_type: Option<&str>,
    description: Option<&str>,
    qualifications: Option<&str>,
) -> AppResult<()> {
    if let Some(title) = title {
        // Titles are stored verbatim; alert matching is whitespace-exact.
        if title.trim().is_empty() {
            return Err(AppError::bad_request("please add a job title"));
        }
    }
    if let Some(salary) = salary {
        if salary <= 0 {
            return Err(AppError::bad_request("salary must be positive"));
        }
    }
    if let Some(job_type) = job_type {
        if !JOB_TYPES.contains(&job_type) {
            return Err(AppError::bad_request(
                "job type must be fullTime or partTime",
            ));
        }
    }
    if let Some(description) = description {
        if description.trim().is_empty() {
            return Err(AppError::bad_request("please add a job description"));
        }
    }
    if let Some(qualifications) = qualifications {
        if qualifications.trim().is_empty() {
            return Err(AppError::bad_request("please add a job qualification"));
        }
    }
    Ok(())
}

pub async fn list_jobs(State(state): State<AppState>) -> AppResult<Json<Envelope<Vec<JobResponse>>>> {
    let mut conn = state.db()?;
    let rows: Vec<Job> = jobs::table.order(jobs::created_at.desc()).load(&mut conn)?;
    Ok(respond::list(rows.into_iter().map(to_job_response).collect()))
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Envelope<JobResponse>>> {
    let mut conn = state.db()?;
    let job = find_job(&mut conn, id)?;
    Ok(respond::one(to_job_response(job)))
}

pub async fn list_job_provider_jobs(
    State(state): State<AppState>,
    Path(provider_id): Path<Uuid>,
) -> AppResult<Json<Envelope<Vec<JobResponse>>>> {
    let mut conn = state.db()?;
    find_job_provider(&mut conn, provider_id)?;

    let rows: Vec<Job> = jobs::table
        .filter(jobs::job_provider_id.eq(provider_id))
        .order(jobs::created_at.desc())
        .load(&mut conn)?;
    Ok(respond::list(rows.into_iter().map(to_job_response).collect()))
}

struct JobFields {
    title: String,
    salary: i64,
    deadline: DateTime<Utc>,
    job_type: Option<String>,
    description: String,
    qualifications: String,
}

fn insert_job(
    conn: &mut PgConnection,
    user: &AuthenticatedUser,
    provider_id: Uuid,
    fields: JobFields,
) -> AppResult<Job> {
    let provider = find_job_provider(conn, provider_id)?;
    require_owner(user, provider.user_id, "add jobs for this jobProvider")?;

    validate_job_fields(
        Some(&fields.title),
        Some(fields.salary),
        fields.job_type.as_deref(),
        Some(&fields.description),
        Some(&fields.qualifications),
    )?;

    let new_job = NewJob {
        id: Uuid::new_v4(),
        title: fields.title,
        salary: fields.salary,
        deadline: fields.deadline.naive_utc(),
        job_type: fields
            .job_type
            .unwrap_or_else(|| JOB_TYPE_FULL_TIME.to_string()),
        description: fields.description,
        qualifications: fields.qualifications,
        job_provider_id: provider_id,
    };

    diesel::insert_into(jobs::table)
        .values(&new_job)
        .execute(conn)?;

    let job: Job = jobs::table.find(new_job.id).first(conn)?;

    // Alert fan-out is best effort: the job is already persisted and the
    // caller gets a 2xx whatever happens here.
    if let Err(err) = notify::dispatch_job_notifications(conn, &job) {
        error!(job_id = %job.id, error = %err, "alert matching failed after job creation");
    }

    Ok(job)
}

pub async fn create_job(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateJobRequest>,
) -> AppResult<(StatusCode, Json<Envelope<JobResponse>>)> {
    let mut conn = state.db()?;
    let job = insert_job(
        &mut conn,
        &user,
        payload.job_provider_id,
        JobFields {
            title: payload.title,
            salary: payload.salary,
            deadline: payload.deadline,
            job_type: payload.job_type,
            description: payload.description,
            qualifications: payload.qualifications,
        },
    )?;
    Ok((StatusCode::CREATED, respond::one(to_job_response(job))))
}

pub async fn create_provider_job(
    State(state): State<AppState>,
    Path(provider_id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateProviderJobRequest>,
) -> AppResult<(StatusCode, Json<Envelope<JobResponse>>)> {
    let mut conn = state.db()?;
    let job = insert_job(
        &mut conn,
        &user,
        provider_id,
        JobFields {
            title: payload.title,
            salary: payload.salary,
            deadline: payload.deadline,
            job_type: payload.job_type,
            description: payload.description,
            qualifications: payload.qualifications,
        },
    )?;
    Ok((StatusCode::CREATED, respond::one(to_job_response(job))))
}

pub async fn update_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(payload): Json<UpdateJobRequest>,
) -> AppResult<Json<Envelope<JobResponse>>> {
    let mut conn = state.db()?;
    let job = find_job(&mut conn, id)?;
    let owner = job_owner_user_id(&mut conn, &job)?;
    require_owner(&user, owner, format!("update job {id}").as_str())?;

    validate_job_fields(
        payload.title.as_deref(),
        payload.salary,
        payload.job_type.as_deref(),
        payload.description.as_deref(),
        payload.qualifications.as_deref(),
    )?;

    let changeset = JobChangeset {
        title: payload.title,
        salary: payload.salary,
        deadline: payload.deadline.map(|value| value.naive_utc()),
        job_type: payload.job_type,
        description: payload.description,
        qualifications: payload.qualifications,
    };

    let no_changes = changeset.title.is_none()
        && changeset.salary.is_none()
        && changeset.deadline.is_none()
        && changeset.job_type.is_none()
        && changeset.description.is_none()
        && changeset.qualifications.is_none();
    if no_changes {
        return Ok(respond::one(to_job_response(job)));
    }

    diesel::update(jobs::table.find(id))
        .set(&changeset)
        .execute(&mut conn)?;

    let updated: Job = jobs::table.find(id).first(&mut conn)?;
    Ok(respond::one(to_job_response(updated)))
}

pub async fn delete_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthenticatedUser,
) -> AppResult<Json<Envelope<serde_json::Value>>> {
    let mut conn = state.db()?;
    let job = find_job(&mut conn, id)?;
    let owner = job_owner_user_id(&mut conn, &job)?;
    require_owner(&user, owner, format!("delete job {id}").as_str())?;

    diesel::delete(jobs::table.find(id)).execute(&mut conn)?;

    Ok(respond::empty())
}
