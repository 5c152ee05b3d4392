use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::{require_owner, require_role, AuthenticatedUser};
use crate::error::{AppError, AppResult};
use crate::models::{JobProvider, NewJobProvider, ROLE_ADMIN, ROLE_JOB_PROVIDER};
use crate::schema::{job_providers, job_seekers, jobs, users};
use crate::state::AppState;
use crate::utils::respond::{self, to_iso, Envelope};

use super::job_seekers::{cleanup_files, file_extension, read_upload};

#[derive(Deserialize)]
pub struct CreateJobProviderRequest {
    pub name: String,
    pub date_of_startup: NaiveDate,
    pub fields: Vec<String>,
    pub bio: String,
    pub email: Option<String>,
    pub company_description: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Deserialize)]
pub struct UpdateJobProviderRequest {
    pub name: Option<String>,
    pub date_of_startup: Option<NaiveDate>,
    pub fields: Option<Vec<String>>,
    pub bio: Option<String>,
    pub email: Option<String>,
    pub company_description: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = job_providers)]
struct JobProviderChangeset {
    name: Option<String>,
    date_of_startup: Option<NaiveDate>,
    fields: Option<Vec<String>>,
    bio: Option<String>,
    email: Option<String>,
    company_description: Option<String>,
    address: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Serialize)]
pub struct JobProviderResponse {
    pub id: Uuid,
    pub name: String,
    pub date_of_startup: NaiveDate,
    pub fields: Vec<String>,
    pub bio: String,
    pub email: Option<String>,
    pub company_description: String,
    pub profile_image: Option<String>,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_approved: bool,
    pub user_id: Uuid,
    pub created_at: String,
}

fn to_job_provider_response(provider: JobProvider) -> JobProviderResponse {
    JobProviderResponse {
        id: provider.id,
        name: provider.name,
        date_of_startup: provider.date_of_startup,
        fields: provider.fields,
        bio: provider.bio,
        email: provider.email,
        company_description: provider.company_description,
        profile_image: provider.profile_image,
        address: provider.address,
        latitude: provider.latitude,
        longitude: provider.longitude,
        is_approved: provider.is_approved,
        user_id: provider.user_id,
        created_at: to_iso(provider.created_at),
    }
}

pub(super) fn find_job_provider(conn: &mut PgConnection, id: Uuid) -> AppResult<JobProvider> {
    job_providers::table
        .find(id)
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::not_found(format!("jobProvider {id} not found")))
}

fn validate_provider_fields(
    name: Option<&str>,
    fields: Option<&[String]>,
    bio: Option<&str>,
    email: Option<&str>,
    company_description: Option<&str>,
    address: Option<&str>,
) -> AppResult<()> {
    if let Some(name) = name {
        if name.trim().is_empty() || name.len() > 50 {
            return Err(AppError::bad_request("name must be 1-50 characters"));
        }
    }
    if let Some(fields) = fields {
        if fields.is_empty() {
            return Err(AppError::bad_request("please add at least one field"));
        }
    }
    if let Some(bio) = bio {
        if bio.trim().is_empty() || bio.len() > 100 {
            return Err(AppError::bad_request("bio must be 1-100 characters"));
        }
    }
    if let Some(email) = email {
        if !email.contains('@') {
            return Err(AppError::bad_request("please add a valid email"));
        }
    }
    if let Some(description) = company_description {
        if description.trim().is_empty() || description.len() > 500 {
            return Err(AppError::bad_request(
                "company description must be 1-500 characters",
            ));
        }
    }
    if let Some(address) = address {
        if address.trim().is_empty() {
            return Err(AppError::bad_request("please add an address"));
        }
    }
    Ok(())
}

pub async fn list_job_providers(
    State(state): State<AppState>,
) -> AppResult<Json<Envelope<Vec<JobProviderResponse>>>> {
    let mut conn = state.db()?;
    let providers: Vec<JobProvider> = job_providers::table
        .order(job_providers::created_at.desc())
        .load(&mut conn)?;
    Ok(respond::list(
        providers.into_iter().map(to_job_provider_response).collect(),
    ))
}

pub async fn get_job_provider(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Envelope<JobProviderResponse>>> {
    let mut conn = state.db()?;
    let provider = find_job_provider(&mut conn, id)?;
    Ok(respond::one(to_job_provider_response(provider)))
}

pub async fn create_job_provider(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateJobProviderRequest>,
) -> AppResult<(StatusCode, Json<Envelope<JobProviderResponse>>)> {
    require_role(&user, &[ROLE_JOB_PROVIDER, ROLE_ADMIN])?;

    validate_provider_fields(
        Some(&payload.name),
        Some(&payload.fields),
        Some(&payload.bio),
        payload.email.as_deref(),
        Some(&payload.company_description),
        Some(&payload.address),
    )?;

    let mut conn = state.db()?;

    let account: Option<crate::models::User> =
        users::table.find(user.user_id).first(&mut conn).optional()?;
    let account = account.ok_or_else(|| {
        AppError::bad_request(format!("the user {} doesn't exist", user.user_id))
    })?;
    if !account.is_verified {
        return Err(AppError::bad_request(format!(
            "the user {} is not verified yet",
            user.user_id
        )));
    }

    let seeker_count: i64 = job_seekers::table
        .filter(job_seekers::user_id.eq(user.user_id))
        .count()
        .get_result(&mut conn)?;
    if seeker_count > 0 {
        return Err(AppError::bad_request(format!(
            "user {} is a jobSeeker",
            user.user_id
        )));
    }

    let existing: i64 = job_providers::table
        .filter(job_providers::user_id.eq(user.user_id))
        .count()
        .get_result(&mut conn)?;
    if existing > 0 {
        return Err(AppError::bad_request(format!(
            "user {} already has a jobProvider",
            user.user_id
        )));
    }

    let new_provider = NewJobProvider {
        id: Uuid::new_v4(),
        name: payload.name.trim().to_string(),
        date_of_startup: payload.date_of_startup,
        fields: payload.fields,
        bio: payload.bio,
        email: payload.email,
        company_description: payload.company_description,
        address: payload.address,
        latitude: payload.latitude,
        longitude: payload.longitude,
        user_id: user.user_id,
    };

    match diesel::insert_into(job_providers::table)
        .values(&new_provider)
        .execute(&mut conn)
    {
        Ok(_) => {}
        Err(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        )) => {
            return Err(AppError::bad_request(format!(
                "user {} already has a jobProvider",
                user.user_id
            )));
        }
        Err(err) => return Err(AppError::from(err)),
    }

    let provider: JobProvider = job_providers::table.find(new_provider.id).first(&mut conn)?;
    Ok((
        StatusCode::CREATED,
        respond::one(to_job_provider_response(provider)),
    ))
}

pub async fn update_job_provider(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(payload): Json<UpdateJobProviderRequest>,
) -> AppResult<Json<Envelope<JobProviderResponse>>> {
    require_role(&user, &[ROLE_JOB_PROVIDER, ROLE_ADMIN])?;

    let mut conn = state.db()?;
    let provider = find_job_provider(&mut conn, id)?;
    require_owner(&user, provider.user_id, "update this jobProvider")?;

    validate_provider_fields(
        payload.name.as_deref(),
        payload.fields.as_deref(),
        payload.bio.as_deref(),
        payload.email.as_deref(),
        payload.company_description.as_deref(),
        payload.address.as_deref(),
    )?;

    let changeset = JobProviderChangeset {
        name: payload.name.map(|value| value.trim().to_string()),
        date_of_startup: payload.date_of_startup,
        fields: payload.fields,
        bio: payload.bio,
        email: payload.email,
        company_description: payload.company_description,
        address: payload.address,
        latitude: payload.latitude,
        longitude: payload.longitude,
    };

    let no_changes = changeset.name.is_none()
        && changeset.date_of_startup.is_none()
        && changeset.fields.is_none()
        && changeset.bio.is_none()
        && changeset.email.is_none()
        && changeset.company_description.is_none()
        && changeset.address.is_none()
        && changeset.latitude.is_none()
        && changeset.longitude.is_none();
    if no_changes {
        return Ok(respond::one(to_job_provider_response(provider)));
    }

    diesel::update(job_providers::table.find(id))
        .set(&changeset)
        .execute(&mut conn)?;

    let updated: JobProvider = job_providers::table.find(id).first(&mut conn)?;
    Ok(respond::one(to_job_provider_response(updated)))
}

pub async fn delete_job_provider(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthenticatedUser,
) -> AppResult<Json<Envelope<serde_json::Value>>> {
    require_role(&user, &[ROLE_JOB_PROVIDER, ROLE_ADMIN])?;

    let mut conn = state.db()?;
    let provider = find_job_provider(&mut conn, id)?;
    require_owner(&user, provider.user_id, "delete this jobProvider")?;

    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        diesel::delete(jobs::table.filter(jobs::job_provider_id.eq(id))).execute(conn)?;
        diesel::delete(job_providers::table.find(id)).execute(conn)?;
        Ok(())
    })?;

    info!(job_provider_id = %id, "deleted jobProvider with its jobs");

    if let Some(photo) = provider.profile_image {
        cleanup_files(state.uploads.clone(), vec![photo]);
    }

    Ok(respond::empty())
}

pub async fn upload_photo(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthenticatedUser,
    multipart: Multipart,
) -> AppResult<Json<Envelope<String>>> {
    require_role(&user, &[ROLE_JOB_PROVIDER, ROLE_ADMIN])?;

    let mut conn = state.db()?;
    let provider = find_job_provider(&mut conn, id)?;
    require_owner(&user, provider.user_id, "update this jobProvider")?;
    drop(conn);

    let upload = read_upload(multipart, state.config.max_upload_bytes).await?;
    if !upload.content_type.starts_with("image/") {
        return Err(AppError::bad_request("please upload an image file"));
    }

    let ext = file_extension(&upload.filename, &upload.content_type).unwrap_or_else(|| "jpg".into());
    let filename = format!("photo_{id}.{ext}");
    state
        .uploads
        .put_file(&filename, upload.bytes)
        .await
        .map_err(|err| AppError::internal(format!("problem with file upload: {err}")))?;

    let mut conn = state.db()?;
    diesel::update(job_providers::table.find(id))
        .set(job_providers::profile_image.eq(&filename))
        .execute(&mut conn)?;

    Ok(respond::one(filename))
}

pub async fn approve_job_provider(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthenticatedUser,
) -> AppResult<Json<Envelope<JobProviderResponse>>> {
    require_role(&user, &[ROLE_ADMIN])?;

    let mut conn = state.db()?;
    find_job_provider(&mut conn, id)?;

    diesel::update(job_providers::table.find(id))
        .set(job_providers::is_approved.eq(true))
        .execute(&mut conn)?;

    let approved: JobProvider = job_providers::table.find(id).first(&mut conn)?;
    Ok(respond::one(to_job_provider_response(approved)))
}
