use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::debug;

use imagecast_backend::{BackendError, Catalog};
use imagecast_core::{Image, NewImage};

use crate::config::PostgresConfig;
use crate::migrations;

type ImageRow = (
    i64,
    Option<String>,
    String,
    String,
    String,
    String,
    i64,
    NaiveDate,
);

const COLUMNS: &str =
    "id, description, image_path, image_file_name, image_extension, url, image_size, update_date";

/// Build `PgConnectOptions` from a [`PostgresConfig`], applying SSL settings
/// when configured.
pub(crate) fn build_connect_options(
    config: &PostgresConfig,
) -> Result<sqlx::postgres::PgConnectOptions, BackendError> {
    let mut options: sqlx::postgres::PgConnectOptions = config
        .url
        .parse()
        .map_err(|e: sqlx::Error| BackendError::Configuration(e.to_string()))?;

    if let Some(ref mode) = config.ssl_mode {
        let ssl_mode = match mode.as_str() {
            "disable" => sqlx::postgres::PgSslMode::Disable,
            "prefer" => sqlx::postgres::PgSslMode::Prefer,
            "require" => sqlx::postgres::PgSslMode::Require,
            "verify-ca" => sqlx::postgres::PgSslMode::VerifyCa,
            "verify-full" => sqlx::postgres::PgSslMode::VerifyFull,
            other => {
                return Err(BackendError::Configuration(format!(
                    "unknown ssl_mode: {other}"
                )));
            }
        };
        options = options.ssl_mode(ssl_mode);
    }

    if let Some(ref path) = config.ssl_root_cert {
        options = options.ssl_root_cert(path);
    }

    Ok(options)
}

/// Map a `sqlx` error onto the backend taxonomy.
fn map_sqlx_error(err: sqlx::Error) -> BackendError {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            BackendError::Conflict(db.message().to_owned())
        }
        sqlx::Error::PoolTimedOut => BackendError::Timeout,
        sqlx::Error::Io(e) => BackendError::Connection(e.to_string()),
        sqlx::Error::Tls(e) => BackendError::Connection(e.to_string()),
        sqlx::Error::PoolClosed => BackendError::Connection("pool closed".into()),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            BackendError::Serialization(err.to_string())
        }
        other => BackendError::Service(other.to_string()),
    }
}

fn row_to_image(row: ImageRow) -> Result<Image, BackendError> {
    let (id, description, image_path, image_file_name, image_extension, url, size, update_date) =
        row;
    let image_size = u64::try_from(size)
        .map_err(|_| BackendError::Serialization(format!("negative image_size: {size}")))?;
    Ok(Image {
        id,
        description,
        image_path,
        image_file_name,
        image_extension,
        url,
        image_size,
        update_date,
    })
}

/// PostgreSQL-backed implementation of [`Catalog`].
///
/// File-name uniqueness is enforced by a `UNIQUE` constraint; a duplicate
/// insert surfaces as [`BackendError::Conflict`].
pub struct PostgresCatalog {
    pool: PgPool,
    config: Arc<PostgresConfig>,
}

impl PostgresCatalog {
    /// Connect, create the pool, and run migrations.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Connection`] if pool creation fails, or
    /// [`BackendError::Service`] if migrations fail.
    pub async fn new(config: PostgresConfig) -> Result<Self, BackendError> {
        let connect_options = build_connect_options(&config)?;
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.pool_size)
            .connect_with(connect_options)
            .await
            .map_err(|e| BackendError::Connection(e.to_string()))?;

        Self::from_pool(pool, config).await
    }

    /// Create a catalog from an existing pool. Runs migrations on creation.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Service`] if migrations fail.
    pub async fn from_pool(pool: PgPool, config: PostgresConfig) -> Result<Self, BackendError> {
        migrations::run_migrations(&pool, &config)
            .await
            .map_err(|e| BackendError::Service(e.to_string()))?;

        Ok(Self {
            pool,
            config: Arc::new(config),
        })
    }
}

#[async_trait]
impl Catalog for PostgresCatalog {
    async fn save(&self, image: NewImage) -> Result<Image, BackendError> {
        let table = self.config.images_table();
        let size = i64::try_from(image.image_size).map_err(|_| {
            BackendError::Serialization(format!("image_size too large: {}", image.image_size))
        })?;

        let query = format!(
            "INSERT INTO {table} \
             (description, image_path, image_file_name, image_extension, url, image_size, update_date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id"
        );

        let (id,): (i64,) = sqlx::query_as(&query)
            .bind(&image.description)
            .bind(&image.image_path)
            .bind(&image.image_file_name)
            .bind(&image.image_extension)
            .bind(&image.url)
            .bind(size)
            .bind(image.update_date)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        debug!(id, file_name = %image.image_file_name, "image record inserted");
        Ok(image.with_id(id))
    }

    async fn find_by_key(&self, file_name: &str) -> Result<Option<Image>, BackendError> {
        let table = self.config.images_table();
        let query = format!("SELECT {COLUMNS} FROM {table} WHERE image_file_name = $1");

        let row: Option<ImageRow> = sqlx::query_as(&query)
            .bind(file_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(row_to_image).transpose()
    }

    async fn delete_by_key(&self, file_name: &str) -> Result<u64, BackendError> {
        let table = self.config.images_table();
        let query = format!("DELETE FROM {table} WHERE image_file_name = $1");

        let result = sqlx::query(&query)
            .bind(file_name)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn find_all(&self) -> Result<Vec<Image>, BackendError> {
        let table = self.config.images_table();
        let query = format!("SELECT {COLUMNS} FROM {table} ORDER BY id");

        let rows: Vec<ImageRow> = sqlx::query_as(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter().map(row_to_image).collect()
    }
}
