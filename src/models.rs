use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::*;

pub const ROLE_JOB_SEEKER: &str = "jobSeeker";
pub const ROLE_JOB_PROVIDER: &str = "jobProvider";
pub const ROLE_ADMIN: &str = "admin";

pub const GENDERS: &[&str] = &["male", "female"];

pub const JOB_TYPE_FULL_TIME: &str = "fullTime";
pub const JOB_TYPES: &[&str] = &["fullTime", "partTime"];

pub const STATUS_PENDING: &str = "pending";
pub const APPLICATION_STATUSES: &[&str] = &["pending", "accept", "reject"];

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub phone: Option<String>,
    pub is_verified: bool,
    pub reset_password_hash: Option<String>,
    pub reset_password_expires_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = job_seekers)]
#[diesel(belongs_to(User))]
pub struct JobSeeker {
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
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = job_seekers)]
pub struct NewJobSeeker {
    pub id: Uuid,
    pub name: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub bio: String,
    pub email: Option<String>,
    pub skills: String,
    pub languages: Vec<String>,
    pub address: String,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = job_providers)]
#[diesel(belongs_to(User))]
pub struct JobProvider {
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
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = job_providers)]
pub struct NewJobProvider {
    pub id: Uuid,
    pub name: String,
    pub date_of_startup: NaiveDate,
    pub fields: Vec<String>,
    pub bio: String,
    pub email: Option<String>,
    pub company_description: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = jobs)]
#[diesel(belongs_to(JobProvider))]
pub struct Job {
    pub id: Uuid,
    pub title: String,
    pub salary: i64,
    pub deadline: NaiveDateTime,
    pub job_type: String,
    pub description: String,
    pub qualifications: String,
    pub job_provider_id: Uuid,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = jobs)]
pub struct NewJob {
    pub id: Uuid,
    pub title: String,
    pub salary: i64,
    pub deadline: NaiveDateTime,
    pub job_type: String,
    pub description: String,
    pub qualifications: String,
    pub job_provider_id: Uuid,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = applications)]
#[diesel(belongs_to(JobSeeker))]
pub struct Application {
    pub id: Uuid,
    pub cv: String,
    pub status: String,
    pub reject_reason: Option<String>,
    pub meeting_date: Option<NaiveDateTime>,
    pub job_id: Uuid,
    pub job_seeker_id: Uuid,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = applications)]
pub struct NewApplication {
    pub id: Uuid,
    pub cv: String,
    pub status: String,
    pub job_id: Uuid,
    pub job_seeker_id: Uuid,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = alerts)]
#[diesel(belongs_to(JobSeeker))]
pub struct Alert {
    pub id: Uuid,
    pub title: String,
    pub job_seeker_id: Uuid,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = alerts)]
pub struct NewAlert {
    pub id: Uuid,
    pub title: String,
    pub job_seeker_id: Uuid,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = notifications)]
#[diesel(belongs_to(JobSeeker))]
pub struct Notification {
    pub id: Uuid,
    pub job_seeker_id: Uuid,
    pub job_id: Uuid,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = notifications)]
pub struct NewNotification {
    pub id: Uuid,
    pub job_seeker_id: Uuid,
    pub job_id: Uuid,
}
