use std::path::Path as FsPath;
use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{require_owner, AuthenticatedUser};
use crate::error::{AppError, AppResult};
use crate::models::{JobSeeker, NewJobSeeker, GENDERS};
use crate::schema::{alerts, applications, job_providers, job_seekers, notifications, users};
use crate::state::AppState;
use crate::storage::UploadStore;
use crate::utils::respond::{self, to_iso, Envelope};

#[derive(Deserialize)]
pub struct CreateJobSeekerRequest {
    pub name: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub bio: String,
    pub email: Option<String>,
    pub skills: String,
    pub languages: Vec<String>,
    pub address: String,
}

#[derive(Deserialize)]
pub struct UpdateJobSeekerRequest {
    pub name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub bio: Option<String>,
    pub email: Option<String>,
    pub skills: Option<String>,
    pub languages: Option<Vec<String>>,
    pub address: Option<String>,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = job_seekers)]
struct JobSeekerChangeset {
    name: Option<String>,
    date_of_birth: Option<NaiveDate>,
    gender: Option<String>,
    bio: Option<String>,
    email: Option<String>,
    skills: Option<String>,
    languages: Option<Vec<String>>,
    address: Option<String>,
}

#[derive(Serialize)]
pub struct JobSeekerResponse {
    pub id: Uuid,
    pub name: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub bio: String,
    pub email: Option<String>,
    pub skills: String,
    pub languages: Vec<String>,
    pub profile_image: Option<String>,
    pub cvs: Vec<String>,
    pub address: String,
    pub user_id: Uuid,
    pub created_at: String,
}

pub(super) fn to_job_seeker_response(seeker: JobSeeker) -> JobSeekerResponse {
    JobSeekerResponse {
        id: seeker.id,
        name: seeker.name,
        date_of_birth: seeker.date_of_birth,
        gender: seeker.gender,
        bio: seeker.bio,
        email: seeker.email,
        skills: seeker.skills,
        languages: seeker.languages,
        profile_image: seeker.profile_image,
        cvs: seeker.cvs,
        address: seeker.address,
        user_id: seeker.user_id,
        created_at: to_iso(seeker.created_at),
    }
}

pub(super) fn find_job_seeker(conn: &mut PgConnection, id: Uuid) -> AppResult<JobSeeker> {
    job_seekers::table
        .find(id)
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::not_found(format!("jobSeeker {id} not found")))
}

/// Resolves the caller's own jobSeeker profile; several child resources
/// (alerts, applications) are created against it rather than an explicit id.
pub(super) fn job_seeker_for_user(conn: &mut PgConnection, user_id: Uuid) -> AppResult<JobSeeker> {
    job_seekers::table
        .filter(job_seekers::user_id.eq(user_id))
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::not_found(format!("no jobSeeker profile for user {user_id}")))
}

fn validate_profile_fields(
    name: Option<&str>,
    gender: Option<&str>,
    bio: Option<&str>,
    email: Option<&str>,
    skills: Option<&str>,
    languages: Option<&[String]>,
    address: Option<&str>,
) -> AppResult<()> {
    if let Some(name) = name {
        if name.trim().is_empty() || name.len() > 50 {
            return Err(AppError::bad_request("name must be 1-50 characters"));
        }
    }
    if let Some(gender) = gender {
        if !GENDERS.contains(&gender) {
            return Err(AppError::bad_request("gender must be male or female"));
        }
    }
    if let Some(bio) = bio {
        if bio.trim().is_empty() || bio.len() > 500 {
            return Err(AppError::bad_request("bio must be 1-500 characters"));
        }
    }
    if let Some(email) = email {
        if !email.contains('@') {
            return Err(AppError::bad_request("please add a valid email"));
        }
    }
    if let Some(skills) = skills {
        if skills.trim().is_empty() {
            return Err(AppError::bad_request("please add at least one skill"));
        }
    }
    if let Some(languages) = languages {
        if languages.is_empty() {
            return Err(AppError::bad_request("please add at least one language"));
        }
    }
    if let Some(address) = address {
        if address.trim().is_empty() {
            return Err(AppError::bad_request("please add an address"));
        }
    }
    Ok(())
}

pub async fn list_job_seekers(
    State(state): State<AppState>,
) -> AppResult<Json<Envelope<Vec<JobSeekerResponse>>>> {
    let mut conn = state.db()?;
    let seekers: Vec<JobSeeker> = job_seekers::table
        .order(job_seekers::created_at.desc())
        .load(&mut conn)?;
    Ok(respond::list(
        seekers.into_iter().map(to_job_seeker_response).collect(),
    ))
}

pub async fn get_job_seeker(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Envelope<JobSeekerResponse>>> {
    let mut conn = state.db()?;
    let seeker = find_job_seeker(&mut conn, id)?;
    Ok(respond::one(to_job_seeker_response(seeker)))
}

pub async fn create_job_seeker(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateJobSeekerRequest>,
) -> AppResult<(StatusCode, Json<Envelope<JobSeekerResponse>>)> {
    validate_profile_fields(
        Some(&payload.name),
        Some(&payload.gender),
        Some(&payload.bio),
        payload.email.as_deref(),
        Some(&payload.skills),
        Some(&payload.languages),
        Some(&payload.address),
    )?;

    let mut conn = state.db()?;
    check_profile_preconditions(&mut conn, &user)?;

    let new_seeker = NewJobSeeker {
        id: Uuid::new_v4(),
        name: payload.name.trim().to_string(),
        date_of_birth: payload.date_of_birth,
        gender: payload.gender,
        bio: payload.bio,
        email: payload.email,
        skills: payload.skills,
        languages: payload.languages,
        address: payload.address,
        user_id: user.user_id,
    };

    match diesel::insert_into(job_seekers::table)
        .values(&new_seeker)
        .execute(&mut conn)
    {
        Ok(_) => {}
        Err(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        )) => {
            // Closes the check-then-create race via the store constraint.
            return Err(AppError::bad_request(format!(
                "user {} already has a jobSeeker",
                user.user_id
            )));
        }
        Err(err) => return Err(AppError::from(err)),
    }

    let seeker: JobSeeker = job_seekers::table.find(new_seeker.id).first(&mut conn)?;
    Ok((
        StatusCode::CREATED,
        respond::one(to_job_seeker_response(seeker)),
    ))
}

/// Creation preconditions: the account must exist and be verified, hold no
/// jobSeeker yet, and hold no jobProvider either (a user is one or the
/// other, never both).
fn check_profile_preconditions(conn: &mut PgConnection, user: &AuthenticatedUser) -> AppResult<()> {
    let account: Option<crate::models::User> = users::table
        .find(user.user_id)
        .first(conn)
        .optional()?;
    let account = account.ok_or_else(|| {
        AppError::bad_request(format!("the user {} doesn't exist", user.user_id))
    })?;
    if !account.is_verified {
        return Err(AppError::bad_request(format!(
            "the user {} is not verified yet",
            user.user_id
        )));
    }

    let existing_seeker: Option<JobSeeker> = job_seekers::table
        .filter(job_seekers::user_id.eq(user.user_id))
        .first(conn)
        .optional()?;
    if existing_seeker.is_some() {
        return Err(AppError::bad_request(format!(
            "user {} already has a jobSeeker",
            user.user_id
        )));
    }

    let existing_provider: i64 = job_providers::table
        .filter(job_providers::user_id.eq(user.user_id))
        .count()
        .get_result(conn)?;
    if existing_provider > 0 {
        return Err(AppError::bad_request(format!(
            "user {} is a jobProvider",
            user.user_id
        )));
    }

    Ok(())
}

pub async fn update_job_seeker(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(payload): Json<UpdateJobSeekerRequest>,
) -> AppResult<Json<Envelope<JobSeekerResponse>>> {
    let mut conn = state.db()?;
    let seeker = find_job_seeker(&mut conn, id)?;
    require_owner(&user, seeker.user_id, "update this jobSeeker")?;

    validate_profile_fields(
        payload.name.as_deref(),
        payload.gender.as_deref(),
        payload.bio.as_deref(),
        payload.email.as_deref(),
        payload.skills.as_deref(),
        payload.languages.as_deref(),
        payload.address.as_deref(),
    )?;

    let changeset = JobSeekerChangeset {
        name: payload.name.map(|value| value.trim().to_string()),
        date_of_birth: payload.date_of_birth,
        gender: payload.gender,
        bio: payload.bio,
        email: payload.email,
        skills: payload.skills,
        languages: payload.languages,
        address: payload.address,
    };

    let no_changes = changeset.name.is_none()
        && changeset.date_of_birth.is_none()
        && changeset.gender.is_none()
        && changeset.bio.is_none()
        && changeset.email.is_none()
        && changeset.skills.is_none()
        && changeset.languages.is_none()
        && changeset.address.is_none();
    if no_changes {
        return Ok(respond::one(to_job_seeker_response(seeker)));
    }

    diesel::update(job_seekers::table.find(id))
        .set(&changeset)
        .execute(&mut conn)?;

    let updated: JobSeeker = job_seekers::table.find(id).first(&mut conn)?;
    Ok(respond::one(to_job_seeker_response(updated)))
}

pub async fn delete_job_seeker(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthenticatedUser,
) -> AppResult<Json<Envelope<serde_json::Value>>> {
    let mut conn = state.db()?;
    let seeker = find_job_seeker(&mut conn, id)?;
    require_owner(&user, seeker.user_id, "delete this jobSeeker")?;

    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        diesel::delete(applications::table.filter(applications::job_seeker_id.eq(id)))
            .execute(conn)?;
        diesel::delete(alerts::table.filter(alerts::job_seeker_id.eq(id))).execute(conn)?;
        diesel::delete(notifications::table.filter(notifications::job_seeker_id.eq(id)))
            .execute(conn)?;
        diesel::delete(job_seekers::table.find(id)).execute(conn)?;
        Ok(())
    })?;

    info!(job_seeker_id = %id, "deleted jobSeeker with dependent records");

    let mut files = seeker.cvs.clone();
    if let Some(photo) = seeker.profile_image.clone() {
        files.push(photo);
    }
    cleanup_files(state.uploads.clone(), files);

    Ok(respond::empty())
}

/// Best-effort removal of uploaded files after the rows are gone; failures
/// are logged and never surfaced to the caller.
pub(super) fn cleanup_files(uploads: Arc<dyn UploadStore>, files: Vec<String>) {
    if files.is_empty() {
        return;
    }
    tokio::spawn(async move {
        for name in files {
            if let Err(err) = uploads.delete_file(&name).await {
                warn!(file = %name, error = %err, "failed to remove uploaded file");
            }
        }
    });
}

pub async fn upload_photo(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthenticatedUser,
    multipart: Multipart,
) -> AppResult<Json<Envelope<String>>> {
    let mut conn = state.db()?;
    let seeker = find_job_seeker(&mut conn, id)?;
    require_owner(&user, seeker.user_id, "update this jobSeeker")?;
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
    diesel::update(job_seekers::table.find(id))
        .set(job_seekers::profile_image.eq(&filename))
        .execute(&mut conn)?;

    Ok(respond::one(filename))
}

pub async fn upload_cv(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthenticatedUser,
    multipart: Multipart,
) -> AppResult<Json<Envelope<String>>> {
    let mut conn = state.db()?;
    let seeker = find_job_seeker(&mut conn, id)?;
    require_owner(&user, seeker.user_id, "update this jobSeeker")?;
    drop(conn);

    let upload = read_upload(multipart, state.config.max_upload_bytes).await?;
    if upload.content_type != "application/pdf" {
        return Err(AppError::bad_request("please upload a pdf file"));
    }

    let filename = format!("cv_{id}_{}.pdf", Uuid::new_v4());
    state
        .uploads
        .put_file(&filename, upload.bytes)
        .await
        .map_err(|err| AppError::internal(format!("problem with file upload: {err}")))?;

    let mut cvs = seeker.cvs;
    cvs.push(filename.clone());

    let mut conn = state.db()?;
    diesel::update(job_seekers::table.find(id))
        .set(job_seekers::cvs.eq(&cvs))
        .execute(&mut conn)?;

    Ok(respond::one(filename))
}

pub async fn delete_cv(
    State(state): State<AppState>,
    Path((id, cv)): Path<(Uuid, String)>,
    user: AuthenticatedUser,
) -> AppResult<Json<Envelope<serde_json::Value>>> {
    let mut conn = state.db()?;
    let seeker = find_job_seeker(&mut conn, id)?;
    require_owner(&user, seeker.user_id, "update this jobSeeker")?;

    if !seeker.cvs.iter().any(|name| *name == cv) {
        return Err(AppError::not_found(format!(
            "jobSeeker {id} has no cv named {cv}"
        )));
    }

    let remaining: Vec<String> = seeker.cvs.into_iter().filter(|name| *name != cv).collect();
    diesel::update(job_seekers::table.find(id))
        .set(job_seekers::cvs.eq(&remaining))
        .execute(&mut conn)?;

    cleanup_files(state.uploads.clone(), vec![cv]);

    Ok(respond::empty())
}

pub(super) struct UploadedFile {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: String,
}

/// Pulls the single `file` field out of a multipart body, enforcing the
/// configured size cap.
pub(super) async fn read_upload(
    mut multipart: Multipart,
    max_bytes: u64,
) -> AppResult<UploadedFile> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(format!("invalid multipart data: {err}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|err| AppError::bad_request(format!("failed to read file bytes: {err}")))?;

        if bytes.len() as u64 > max_bytes {
            return Err(AppError::bad_request(format!(
                "please upload a file smaller than {max_bytes} bytes"
            )));
        }

        return Ok(UploadedFile {
            bytes: bytes.to_vec(),
            filename,
            content_type,
        });
    }

    Err(AppError::bad_request("please upload a file"))
}

/// Extension taken from the client filename, falling back to the MIME type.
pub(super) fn file_extension(filename: &str, content_type: &str) -> Option<String> {
    if let Some(ext) = FsPath::new(filename).extension().and_then(|ext| ext.to_str()) {
        return Some(ext.to_ascii_lowercase());
    }
    mime_guess::get_mime_extensions_str(content_type)
        .and_then(|exts| exts.first())
        .map(|ext| ext.to_string())
}
