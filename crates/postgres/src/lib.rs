mod catalog;
mod config;
mod migrations;

pub use catalog::PostgresCatalog;
pub use config::PostgresConfig;
pub use migrations::run_migrations;
