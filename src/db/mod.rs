use anyhow::Result;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, SqlErr, Statement,
};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::dispositivo::{DeviceListQuery, DevicePage, DeviceUpdate};

/// Business-rule and storage failures surfaced by the repositories.
///
/// The uniqueness pre-checks in the repositories are a best-effort fast
/// path; the store's unique indexes are the authoritative backstop. A
/// concurrent insert that slips past the pre-check still surfaces as the
/// matching duplicate variant via `remap_unique`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Nome de usuário já existe")]
    DuplicateUsername,

    #[error("Categoria com este nome já existe")]
    DuplicateName,

    #[error("Dispositivo com este serial já existe.")]
    DuplicateSerial,

    /// Carries the full resource-specific message so each resource keeps
    /// its grammatical inflection.
    #[error("{0}")]
    NotFound(String),

    #[error("Não é possível excluir a categoria, pois existem dispositivos vinculados.")]
    HasDependents,

    #[error("Categoria_id inválida.")]
    InvalidCategory,

    #[error(transparent)]
    Db(#[from] DbErr),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Remap a store-level unique-constraint violation to the business-rule
/// duplicate error, so a lost uniqueness race is indistinguishable from a
/// failed pre-check.
fn remap_unique(err: DbErr, duplicate: StoreError) -> StoreError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => duplicate,
        _ => StoreError::Db(err),
    }
}

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn categoria_repo(&self) -> repositories::categoria::CategoriaRepository {
        repositories::categoria::CategoriaRepository::new(self.conn.clone())
    }

    fn dispositivo_repo(&self) -> repositories::dispositivo::DispositivoRepository {
        repositories::dispositivo::DispositivoRepository::new(self.conn.clone())
    }

    // ========== Users ==========

    pub async fn register_user(
        &self,
        username: &str,
        password: &str,
        security: &crate::config::SecurityConfig,
    ) -> Result<(), StoreError> {
        self.user_repo().register(username, password, security).await
    }

    /// Returns the user id when the credentials match, `None` otherwise.
    pub async fn verify_user_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<i32>, StoreError> {
        self.user_repo().verify_credentials(username, password).await
    }

    // ========== Categorias ==========

    pub async fn create_categoria(
        &self,
        nome: String,
        descricao: Option<String>,
    ) -> Result<crate::entities::categorias::Model, StoreError> {
        self.categoria_repo().create(nome, descricao).await
    }

    pub async fn list_categorias(
        &self,
    ) -> Result<Vec<crate::entities::categorias::Model>, StoreError> {
        self.categoria_repo().list().await
    }

    pub async fn get_categoria(
        &self,
        id: i32,
    ) -> Result<crate::entities::categorias::Model, StoreError> {
        self.categoria_repo().get(id).await
    }

    pub async fn update_categoria(
        &self,
        id: i32,
        nome: Option<String>,
        descricao: Option<Option<String>>,
    ) -> Result<crate::entities::categorias::Model, StoreError> {
        self.categoria_repo().update(id, nome, descricao).await
    }

    pub async fn delete_categoria(&self, id: i32) -> Result<(), StoreError> {
        self.categoria_repo().delete(id).await
    }

    // ========== Dispositivos ==========

    pub async fn create_dispositivo(
        &self,
        nome: String,
        serial: String,
        categoria_id: Option<i32>,
        status: Option<String>,
    ) -> Result<repositories::dispositivo::DeviceRecord, StoreError> {
        self.dispositivo_repo()
            .create(nome, serial, categoria_id, status)
            .await
    }

    pub async fn get_dispositivo(
        &self,
        id: i32,
    ) -> Result<repositories::dispositivo::DeviceRecord, StoreError> {
        self.dispositivo_repo().get(id).await
    }

    pub async fn update_dispositivo(
        &self,
        id: i32,
        update: DeviceUpdate,
    ) -> Result<repositories::dispositivo::DeviceRecord, StoreError> {
        self.dispositivo_repo().update(id, update).await
    }

    pub async fn delete_dispositivo(&self, id: i32) -> Result<(), StoreError> {
        self.dispositivo_repo().delete(id).await
    }

    pub async fn list_dispositivos(
        &self,
        query: DeviceListQuery,
    ) -> Result<DevicePage, StoreError> {
        self.dispositivo_repo().list(query).await
    }
}
