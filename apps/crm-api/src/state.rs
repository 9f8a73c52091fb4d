//! Application state for the CRM API

use anyhow::Result;
use crm_docgen::{DocgenConfig, DocumentGenerator};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::PathBuf;

use crate::store::SqliteStore;

/// Application context handed to startup and then shared with handlers
pub struct AppState {
    pub db: SqlitePool,
    pub store: SqliteStore,
    pub generator: DocumentGenerator<SqliteStore>,
    initialized: bool,
}

impl AppState {
    /// Build state from environment variables
    ///
    /// - DATABASE_URL: SQLite URL (default: file under the platform data dir)
    /// - CRM_DEFAULT_TIMEZONE: fallback zone for generated dates
    pub async fn new() -> Result<Self> {
        // Get database path from env or use default
        let db_path = std::env::var("DATABASE_URL").unwrap_or_else(|_| {
            let data_dir = dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("crm-api");
            std::fs::create_dir_all(&data_dir).ok();
            format!("sqlite:{}/crm.db?mode=rwc", data_dir.display())
        });

        let config = DocgenConfig::from_env()?;
        tracing::info!(
            "Default timezone for generated documents: {}",
            config.default_timezone.name()
        );

        Self::connect(&db_path, config).await
    }

    pub async fn connect(db_path: &str, config: DocgenConfig) -> Result<Self> {
        tracing::info!("Connecting to database: {}", db_path);

        let options = if db_path.contains(":memory:") {
            // Every connection to an in-memory database is a separate
            // database; keep exactly one alive.
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = options.connect(db_path).await?;

        let store = SqliteStore::new(pool.clone());
        Ok(Self {
            db: pool,
            generator: DocumentGenerator::new(store.clone(), config),
            store,
            initialized: false,
        })
    }

    /// Run one-time startup work. Returns false if it already ran.
    pub async fn initialize(&mut self) -> Result<bool> {
        if self.initialized {
            tracing::debug!("Application already initialized");
            return Ok(false);
        }

        Self::run_migrations(&self.db).await?;
        self.initialized = true;
        Ok(true)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                content TEXT NOT NULL,
                category TEXT NOT NULL DEFAULT 'other',
                is_template INTEGER NOT NULL,
                variables_json TEXT NOT NULL DEFAULT '[]',
                lead_id TEXT,
                created_at TEXT NOT NULL,
                last_modified TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_documents_lead ON documents(lead_id)
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS leads (
                id TEXT PRIMARY KEY,
                data_json TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        // Append-only association list; deleting a document leaves its row
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS lead_documents (
                lead_id TEXT NOT NULL,
                document_id TEXT NOT NULL,
                linked_at TEXT NOT NULL,
                PRIMARY KEY (lead_id, document_id)
            )
            "#,
        )
        .execute(pool)
        .await?;

        tracing::info!("Migrations complete");
        Ok(())
    }
}

/// Get platform-specific data directory
mod dirs {
    use std::path::PathBuf;

    pub fn data_dir() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library/Application Support"))
        }
        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_DATA_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".local/share"))
                })
        }
        #[cfg(target_os = "windows")]
        {
            std::env::var("APPDATA").ok().map(PathBuf::from)
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            None
        }
    }
}
