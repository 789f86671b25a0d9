use sqlx::PgPool;

use crate::config::PostgresConfig;

/// Run database migrations, creating the images table if it does not exist.
///
/// # Errors
///
/// Returns a [`sqlx::Error`] if any DDL statement fails.
pub async fn run_migrations(pool: &PgPool, config: &PostgresConfig) -> Result<(), sqlx::Error> {
    let images_table = config.images_table();

    let create_images = format!(
        "CREATE TABLE IF NOT EXISTS {images_table} (
            id BIGSERIAL PRIMARY KEY,
            description TEXT,
            image_path TEXT NOT NULL,
            image_file_name TEXT NOT NULL UNIQUE,
            image_extension TEXT NOT NULL,
            url TEXT NOT NULL,
            image_size BIGINT NOT NULL CHECK (image_size >= 0),
            update_date DATE NOT NULL
        )"
    );

    sqlx::query(&create_images).execute(pool).await?;

    Ok(())
}
