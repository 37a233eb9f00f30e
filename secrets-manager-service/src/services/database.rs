//! PostgreSQL entity store for secrets-manager-service.

use crate::models::{
    AccessMode, AuthRequest, AuthRequestResponse, NewAuthRequest, NewSecret, Project, Secret,
};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::store::EntityStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

const SECRET_COLUMNS: &str = r#"
    s.id, s.organization_id, s.key, s.value, s.note, ps.project_id,
    s.creation_date, s.revision_date, s.deleted_date
"#;

const AUTH_REQUEST_COLUMNS: &str = r#"
    id, user_id, request_type, request_device_identifier, request_ip_address,
    access_code, public_key, key, master_password_hash, approved, response_device_id,
    creation_date, response_date, authentication_date
"#;

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "secrets-manager-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl EntityStore for Database {
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Project Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self, name), fields(organization_id = %organization_id))]
    async fn create_project(&self, organization_id: Uuid, name: &str) -> Result<Project, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_project"])
            .start_timer();

        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (id, organization_id, name)
            VALUES ($1, $2, $3)
            RETURNING id, organization_id, name, creation_date, revision_date
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(organization_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create project: {}", e)))?;

        timer.observe_duration();

        info!(project_id = %project.id, "Project created");

        Ok(project)
    }

    #[instrument(skip(self), fields(organization_id = %organization_id, mode = %mode))]
    async fn list_projects_by_org(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        mode: AccessMode,
    ) -> Result<Vec<Project>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_projects_by_org"])
            .start_timer();

        let projects = match mode {
            AccessMode::NoAccessCheck => {
                sqlx::query_as::<_, Project>(
                    r#"
                    SELECT id, organization_id, name, creation_date, revision_date
                    FROM projects
                    WHERE organization_id = $1
                    ORDER BY creation_date, id
                    "#,
                )
                .bind(organization_id)
                .fetch_all(&self.pool)
                .await
            }
            AccessMode::User => {
                sqlx::query_as::<_, Project>(
                    r#"
                    SELECT p.id, p.organization_id, p.name, p.creation_date, p.revision_date
                    FROM projects p
                    INNER JOIN project_access pa ON pa.project_id = p.id AND pa.user_id = $2
                    WHERE p.organization_id = $1
                    ORDER BY p.creation_date, p.id
                    "#,
                )
                .bind(organization_id)
                .bind(user_id)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list projects: {}", e)))?;

        timer.observe_duration();

        Ok(projects)
    }

    #[instrument(skip(self), fields(user_id = %user_id, project_id = %project_id))]
    async fn grant_project_access(&self, user_id: Uuid, project_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO project_access (user_id, project_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(project_id)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                AppError::NotFound(anyhow::anyhow!("Project {} not found", project_id))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to grant access: {}", e)),
        })?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Secret Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self, secret), fields(organization_id = %organization_id, project_id = ?project_id))]
    async fn create_secret(
        &self,
        organization_id: Uuid,
        secret: NewSecret,
        project_id: Option<Uuid>,
    ) -> Result<Secret, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_secret"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        if let Some(project_id) = project_id {
            let exists: Option<(Uuid,)> = sqlx::query_as(
                "SELECT id FROM projects WHERE id = $1 AND organization_id = $2 FOR SHARE",
            )
            .bind(project_id)
            .bind(organization_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to look up project: {}", e))
            })?;

            if exists.is_none() {
                return Err(AppError::NotFound(anyhow::anyhow!(
                    "Project {} not found in organization",
                    project_id
                )));
            }
        }

        let created = Secret::new(organization_id, secret, project_id, Utc::now());

        sqlx::query(
            r#"
            INSERT INTO secrets (id, organization_id, key, value, note, creation_date, revision_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(created.id)
        .bind(created.organization_id)
        .bind(&created.key)
        .bind(&created.value)
        .bind(&created.note)
        .bind(created.creation_date)
        .bind(created.revision_date)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create secret: {}", e)))?;

        if let Some(project_id) = created.project_id {
            sqlx::query("INSERT INTO project_secret (project_id, secret_id) VALUES ($1, $2)")
                .bind(project_id)
                .bind(created.id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!(
                        "Failed to link secret to project: {}",
                        e
                    ))
                })?;
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit secret: {}", e))
        })?;

        timer.observe_duration();

        info!(secret_id = %created.id, "Secret created");

        Ok(created)
    }

    #[instrument(skip(self), fields(organization_id = %organization_id, mode = %mode))]
    async fn list_secrets_by_org(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        mode: AccessMode,
    ) -> Result<Vec<Secret>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_secrets_by_org"])
            .start_timer();

        let secrets = match mode {
            AccessMode::NoAccessCheck => {
                sqlx::query_as::<_, Secret>(&format!(
                    r#"
                    SELECT {SECRET_COLUMNS}
                    FROM secrets s
                    LEFT JOIN project_secret ps ON ps.secret_id = s.id
                    WHERE s.organization_id = $1 AND s.deleted_date IS NULL
                    ORDER BY s.creation_date, s.id
                    "#
                ))
                .bind(organization_id)
                .fetch_all(&self.pool)
                .await
            }
            AccessMode::User => {
                sqlx::query_as::<_, Secret>(&format!(
                    r#"
                    SELECT {SECRET_COLUMNS}
                    FROM secrets s
                    INNER JOIN project_secret ps ON ps.secret_id = s.id
                    INNER JOIN project_access pa ON pa.project_id = ps.project_id AND pa.user_id = $2
                    WHERE s.organization_id = $1 AND s.deleted_date IS NULL
                    ORDER BY s.creation_date, s.id
                    "#
                ))
                .bind(organization_id)
                .bind(user_id)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list secrets: {}", e)))?;

        timer.observe_duration();

        Ok(secrets)
    }

    #[instrument(skip(self, ids), fields(organization_id = %organization_id, count = ids.len()))]
    async fn trash_secrets(
        &self,
        organization_id: Uuid,
        ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE secrets
            SET deleted_date = $3, revision_date = $3
            WHERE organization_id = $1 AND id = ANY($2) AND deleted_date IS NULL
            "#,
        )
        .bind(organization_id)
        .bind(ids)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to trash secrets: {}", e)))?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self, ids), fields(organization_id = %organization_id, count = ids.len()))]
    async fn restore_secrets(&self, organization_id: Uuid, ids: &[Uuid]) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE secrets
            SET deleted_date = NULL, revision_date = NOW()
            WHERE organization_id = $1 AND id = ANY($2) AND deleted_date IS NOT NULL
            "#,
        )
        .bind(organization_id)
        .bind(ids)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to restore secrets: {}", e))
        })?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self), fields(organization_id = %organization_id))]
    async fn list_trashed_secrets(&self, organization_id: Uuid) -> Result<Vec<Secret>, AppError> {
        sqlx::query_as::<_, Secret>(&format!(
            r#"
            SELECT {SECRET_COLUMNS}
            FROM secrets s
            LEFT JOIN project_secret ps ON ps.secret_id = s.id
            WHERE s.organization_id = $1 AND s.deleted_date IS NOT NULL
            ORDER BY s.deleted_date, s.id
            "#
        ))
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list trash: {}", e)))
    }

    #[instrument(skip(self), fields(cutoff = %cutoff))]
    async fn delete_trashed_secrets_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_trashed_secrets"])
            .start_timer();

        // project_secret rows go with the secret through ON DELETE CASCADE.
        let result = sqlx::query(
            r#"
            DELETE FROM secrets
            WHERE deleted_date IS NOT NULL AND deleted_date <= $1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to empty secret trash: {}", e))
        })?;

        timer.observe_duration();

        Ok(result.rows_affected())
    }

    // -------------------------------------------------------------------------
    // Auth Request Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self, input), fields(user_id = %input.user_id, request_type = %input.request_type))]
    async fn create_auth_request(&self, input: NewAuthRequest) -> Result<AuthRequest, AppError> {
        let request = sqlx::query_as::<_, AuthRequest>(&format!(
            r#"
            INSERT INTO auth_requests
                (id, user_id, request_type, request_device_identifier, request_ip_address,
                 access_code, public_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {AUTH_REQUEST_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(input.user_id)
        .bind(input.request_type.as_str())
        .bind(&input.request_device_identifier)
        .bind(&input.request_ip_address)
        .bind(&input.access_code)
        .bind(&input.public_key)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to create auth request: {}", e))
        })?;

        info!(auth_request_id = %request.id, "Auth request created");

        Ok(request)
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn list_auth_requests_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<AuthRequest>, AppError> {
        sqlx::query_as::<_, AuthRequest>(&format!(
            r#"
            SELECT {AUTH_REQUEST_COLUMNS}
            FROM auth_requests
            WHERE user_id = $1
            ORDER BY creation_date, id
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list auth requests: {}", e))
        })
    }

    #[instrument(skip(self), fields(auth_request_id = %id, user_id = %user_id))]
    async fn get_auth_request(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<AuthRequest>, AppError> {
        sqlx::query_as::<_, AuthRequest>(&format!(
            r#"
            SELECT {AUTH_REQUEST_COLUMNS}
            FROM auth_requests
            WHERE id = $1 AND user_id = $2
            "#
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to fetch auth request: {}", e)))
    }

    #[instrument(skip(self, response), fields(auth_request_id = %id, approved = response.approved))]
    async fn respond_to_auth_request(
        &self,
        id: Uuid,
        user_id: Uuid,
        response: AuthRequestResponse,
        now: DateTime<Utc>,
    ) -> Result<Option<AuthRequest>, AppError> {
        sqlx::query_as::<_, AuthRequest>(&format!(
            r#"
            UPDATE auth_requests
            SET response_device_id = $3,
                approved = $4,
                response_date = $5,
                key = CASE WHEN $4 THEN $6 ELSE NULL END,
                master_password_hash = CASE WHEN $4 THEN $7 ELSE NULL END
            WHERE id = $1 AND user_id = $2 AND response_date IS NULL
            RETURNING {AUTH_REQUEST_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(response.device_id)
        .bind(response.approved)
        .bind(now)
        .bind(&response.key)
        .bind(&response.master_password_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to respond to auth request: {}", e))
        })
    }

    #[instrument(skip(self), fields(cutoff = %cutoff))]
    async fn delete_expired_auth_requests(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_expired_auth_requests"])
            .start_timer();

        let result = sqlx::query("DELETE FROM auth_requests WHERE creation_date <= $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!(
                    "Failed to delete expired auth requests: {}",
                    e
                ))
            })?;

        timer.observe_duration();

        Ok(result.rows_affected())
    }
}
