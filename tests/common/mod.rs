use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use anyhow::{anyhow, ensure, Context, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use http_body_util::BodyExt;
use jobboard::auth::jwt::JwtService;
use jobboard::config::AppConfig;
use jobboard::db::{self, PgPool};
use jobboard::models::{NewAlert, NewApplication, NewJobProvider, NewJobSeeker, NewUser};
use jobboard::routes;
use jobboard::sms::{SmsError, SmsVerifier};
use jobboard::state::AppState;
use jobboard::storage::UploadStore;
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tower::util::ServiceExt;
use uuid::Uuid;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

static DB_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// The code [`FakeSms`] accepts for any phone number.
#[allow(dead_code)]
pub const FAKE_SMS_CODE: &str = "123456";

#[derive(Default)]
pub struct FakeUploadStore {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl UploadStore for FakeUploadStore {
    async fn put_file(&self, name: &str, bytes: Vec<u8>) -> Result<()> {
        let mut guard = self.files.lock().await;
        guard.insert(name.to_string(), bytes);
        Ok(())
    }

    async fn delete_file(&self, name: &str) -> Result<()> {
        let mut guard = self.files.lock().await;
        guard.remove(name);
        Ok(())
    }
}

impl FakeUploadStore {
    #[allow(dead_code)]
    pub async fn get(&self, name: &str) -> Option<Vec<u8>> {
        let guard = self.files.lock().await;
        guard.get(name).cloned()
    }

    #[allow(dead_code)]
    pub async fn file_count(&self) -> usize {
        let guard = self.files.lock().await;
        guard.len()
    }
}

/// Accepts [`FAKE_SMS_CODE`] for every phone number and records the numbers
/// that asked for a verification.
#[derive(Default)]
pub struct FakeSms {
    started: Mutex<Vec<String>>,
}

#[async_trait]
impl SmsVerifier for FakeSms {
    async fn start_verification(&self, phone: &str) -> Result<(), SmsError> {
        let mut guard = self.started.lock().await;
        guard.push(phone.to_string());
        Ok(())
    }

    async fn check_verification(&self, _phone: &str, code: &str) -> Result<bool, SmsError> {
        Ok(code == FAKE_SMS_CODE)
    }
}

impl FakeSms {
    #[allow(dead_code)]
    pub async fn started_count(&self) -> usize {
        let guard = self.started.lock().await;
        guard.len()
    }
}

pub struct TestApp {
    pub state: AppState,
    router: Router,
    uploads: Arc<FakeUploadStore>,
    #[allow(dead_code)]
    sms: Arc<FakeSms>,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        let database_url = env::var("TEST_DATABASE_URL")
            .context("TEST_DATABASE_URL must be set for integration tests")?;

        let config = AppConfig {
            database_url: database_url.clone(),
            database_max_pool_size: db::DEFAULT_MAX_POOL_SIZE,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            jwt_secret: "test-secret".to_string(),
            jwt_issuer: "test-issuer".to_string(),
            jwt_audience: "test-audience".to_string(),
            jwt_expiry_minutes: 60,
            cookie_secure: false,
            cookie_domain: None,
            cors_allowed_origin: None,
            upload_root: std::path::PathBuf::from("/tmp/jobboard-test-uploads"),
            max_upload_bytes: 1024 * 1024,
            twilio_account_sid: None,
            twilio_auth_token: None,
            twilio_verify_service: None,
        };

        let pool = db::init_pool(&config.database_url, config.database_max_pool_size)?;
        prepare_database(&pool).await?;

        let uploads = Arc::new(FakeUploadStore::default());
        let uploads_for_state: Arc<dyn UploadStore> = uploads.clone();
        let sms = Arc::new(FakeSms::default());
        let sms_for_state: Arc<dyn SmsVerifier> = sms.clone();
        let jwt = JwtService::from_config(&config)?;
        let state = AppState::new(pool.clone(), config, uploads_for_state, sms_for_state, jwt);
        let router = routes::create_router(state.clone());

        Ok(Self {
            state,
            router,
            uploads,
            sms,
        })
    }

    pub async fn cleanup(&self) -> Result<()> {
        let pool = self.state.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get cleanup connection: {err}"))?;
            truncate_all(&mut conn)?;
            Ok(())
        })
        .await
        .context("cleanup task panicked")?
    }

    #[allow(dead_code)]
    pub fn uploads(&self) -> Arc<FakeUploadStore> {
        self.uploads.clone()
    }

    pub async fn insert_user(
        &self,
        email: &str,
        password: &str,
        role: &str,
        verified: bool,
    ) -> Result<Uuid> {
        let email = email.to_string();
        let password = password.to_string();
        let role = role.to_string();
        self.with_conn(move |conn| {
            let password_hash = hash_password(&password)?;
            let user = NewUser {
                id: Uuid::new_v4(),
                email,
                password_hash,
                role,
                phone: None,
            };
            diesel::insert_into(jobboard::schema::users::table)
                .values(&user)
                .execute(conn)
                .context("failed to insert user")?;
            if verified {
                diesel::update(jobboard::schema::users::table.find(user.id))
                    .set(jobboard::schema::users::is_verified.eq(true))
                    .execute(conn)
                    .context("failed to mark user verified")?;
            }
            Ok(user.id)
        })
        .await
    }

    pub async fn insert_job_seeker(&self, user_id: Uuid, name: &str) -> Result<Uuid> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            let seeker = NewJobSeeker {
                id: Uuid::new_v4(),
                name,
                date_of_birth: NaiveDate::from_ymd_opt(1995, 4, 12)
                    .ok_or_else(|| anyhow!("invalid date"))?,
                gender: "female".to_string(),
                bio: "integration test seeker".to_string(),
                email: None,
                skills: "testing".to_string(),
                languages: vec!["english".to_string()],
                address: "1 Test Street".to_string(),
                user_id,
            };
            diesel::insert_into(jobboard::schema::job_seekers::table)
                .values(&seeker)
                .execute(conn)
                .context("failed to insert job seeker")?;
            Ok(seeker.id)
        })
        .await
    }

    pub async fn insert_job_provider(&self, user_id: Uuid, name: &str) -> Result<Uuid> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            let provider = NewJobProvider {
                id: Uuid::new_v4(),
                name,
                date_of_startup: NaiveDate::from_ymd_opt(2015, 1, 1)
                    .ok_or_else(|| anyhow!("invalid date"))?,
                fields: vec!["software".to_string()],
                bio: "integration test provider".to_string(),
                email: None,
                company_description: "builds software".to_string(),
                address: "2 Test Avenue".to_string(),
                latitude: None,
                longitude: None,
                user_id,
            };
            diesel::insert_into(jobboard::schema::job_providers::table)
                .values(&provider)
                .execute(conn)
                .context("failed to insert job provider")?;
            Ok(provider.id)
        })
        .await
    }

    pub async fn insert_alert(&self, job_seeker_id: Uuid, title: &str) -> Result<Uuid> {
        let title = title.to_string();
        self.with_conn(move |conn| {
            let alert = NewAlert {
                id: Uuid::new_v4(),
                title,
                job_seeker_id,
            };
            diesel::insert_into(jobboard::schema::alerts::table)
                .values(&alert)
                .execute(conn)
                .context("failed to insert alert")?;
            Ok(alert.id)
        })
        .await
    }

    #[allow(dead_code)]
    pub async fn insert_application(&self, job_seeker_id: Uuid, job_id: Uuid) -> Result<Uuid> {
        self.with_conn(move |conn| {
            let application = NewApplication {
                id: Uuid::new_v4(),
                cv: "cv_on_file.pdf".to_string(),
                status: "pending".to_string(),
                job_id,
                job_seeker_id,
            };
            diesel::insert_into(jobboard::schema::applications::table)
                .values(&application)
                .execute(conn)
                .context("failed to insert application")?;
            Ok(application.id)
        })
        .await
    }

    #[allow(dead_code)]
    pub async fn notification_count(&self, job_seeker_id: Uuid) -> Result<i64> {
        self.with_conn(move |conn| {
            use jobboard::schema::notifications::dsl;
            let count = dsl::notifications
                .filter(dsl::job_seeker_id.eq(job_seeker_id))
                .count()
                .get_result(conn)
                .context("failed to count notifications")?;
            Ok(count)
        })
        .await
    }

    pub async fn login_token(&self, email: &str, password: &str) -> Result<String> {
        #[derive(Serialize)]
        struct LoginPayload<'a> {
            email: &'a str,
            password: &'a str,
        }

        let response = self
            .post_json("/api/v1/auth/login", &LoginPayload { email, password }, None)
            .await?;

        ensure!(
            response.status() == StatusCode::OK,
            "login failed with status {}",
            response.status()
        );

        let body = json_body(response.into_body()).await?;
        body["data"]["token"]
            .as_str()
            .map(|token| token.to_string())
            .ok_or_else(|| anyhow!("login response missing token"))
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        self.send_json(Method::POST, path, payload, token).await
    }

    pub async fn put_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        self.send_json(Method::PUT, path, payload, token).await
    }

    async fn send_json<T: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        let builder = Request::builder().method(Method::DELETE).uri(path);
        let builder = if let Some(token) = token {
            builder.header("authorization", format!("Bearer {token}"))
        } else {
            builder
        };
        let request = builder.body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    #[allow(dead_code)]
    pub async fn upload_file(
        &self,
        path: &str,
        filename: &str,
        content_type: &str,
        data: &[u8],
        token: &str,
    ) -> Result<hyper::Response<Body>> {
        let boundary = format!("boundary-{}", Uuid::new_v4());
        let mut body = Vec::new();
        body.extend(format!("--{boundary}\r\n").as_bytes());
        body.extend(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
                filename
            )
            .as_bytes(),
        );
        body.extend(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        body.extend(data);
        body.extend(b"\r\n");
        body.extend(format!("--{boundary}--\r\n").as_bytes());

        let builder = Request::builder()
            .method(Method::PUT)
            .uri(path)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .header("authorization", format!("Bearer {token}"));

        let request = builder.body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut PgConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.state.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get database connection: {err}"))?;
            f(&mut conn)
        })
        .await
        .context("connection task panicked")?
    }
}

pub async fn acquire_db_lock() -> tokio::sync::MutexGuard<'static, ()> {
    DB_LOCK.lock().await
}

pub async fn json_body(body: Body) -> Result<Value> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(serde_json::from_slice(&collected.to_bytes())?)
}

async fn prepare_database(pool: &PgPool) -> Result<()> {
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut conn = pool
            .get()
            .map_err(|err| anyhow!("failed to acquire connection: {err}"))?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|err| anyhow!("failed to run migrations: {err}"))?;
        truncate_all(&mut conn)?;
        Ok(())
    })
    .await
    .context("migration task panicked")?
}

fn truncate_all(conn: &mut PgConnection) -> Result<()> {
    conn.batch_execute(
        "TRUNCATE TABLE notifications, alerts, applications, jobs, job_providers, job_seekers, users RESTART IDENTITY CASCADE;",
    )
    .context("failed to truncate tables")?;
    Ok(())
}

fn hash_password(password: &str) -> Result<String> {
    use argon2::password_hash::{PasswordHasher, SaltString};
    use argon2::Argon2;

    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("failed to hash password: {err}"))?
        .to_string())
}
