use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};

use crate::db::{StoreError, remap_unique};
use crate::entities::{categorias, dispositivos, prelude::*};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;
pub const STATUS_ATIVO: &str = "ativo";
pub const STATUS_INATIVO: &str = "inativo";

/// A device row joined with its optional category (for the denormalized
/// `categoria_nome` projection).
pub type DeviceRecord = (dispositivos::Model, Option<categorias::Model>);

/// Partial update payload. Outer `Option` = key supplied at all; for
/// `categoria_id` the inner `Option` distinguishes "set to this category"
/// from "clear the link" (explicit null).
#[derive(Debug, Default)]
pub struct DeviceUpdate {
    pub nome: Option<String>,
    pub serial: Option<String>,
    pub status: Option<String>,
    pub categoria_id: Option<Option<i32>>,
}

#[derive(Debug, Clone)]
pub struct DeviceListQuery {
    pub page: u64,
    pub limit: u64,
    pub sort: String,
    pub order: String,
    pub status: Option<String>,
    pub categoria_id: Option<i32>,
    pub busca: Option<String>,
}

#[derive(Debug)]
pub struct DevicePage {
    pub items: Vec<DeviceRecord>,
    pub total_records: u64,
    pub total_pages: u64,
    pub current_page: u64,
    pub limit: u64,
}

/// Allow-listed sortable columns; anything unrecognized falls back to `id`
/// rather than erroring or exposing arbitrary attributes.
fn sort_column(name: &str) -> dispositivos::Column {
    match name {
        "nome" => dispositivos::Column::Nome,
        "serial" => dispositivos::Column::Serial,
        "status" => dispositivos::Column::Status,
        "categoria_id" => dispositivos::Column::CategoriaId,
        "created_at" => dispositivos::Column::CreatedAt,
        "updated_at" => dispositivos::Column::UpdatedAt,
        _ => dispositivos::Column::Id,
    }
}

pub struct DispositivoRepository {
    conn: DatabaseConnection,
}

impl DispositivoRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    async fn categoria_exists(&self, id: i32) -> Result<bool, StoreError> {
        let found = Categorias::find_by_id(id).one(&self.conn).await?;
        Ok(found.is_some())
    }

    /// Create a device, enforcing serial uniqueness and, when a category is
    /// linked, that the category exists at the moment of write.
    pub async fn create(
        &self,
        nome: String,
        serial: String,
        categoria_id: Option<i32>,
        status: Option<String>,
    ) -> Result<DeviceRecord, StoreError> {
        let exists = Dispositivos::find()
            .filter(dispositivos::Column::Serial.eq(&serial))
            .one(&self.conn)
            .await?;

        if exists.is_some() {
            return Err(StoreError::DuplicateSerial);
        }

        if let Some(cat_id) = categoria_id
            && !self.categoria_exists(cat_id).await?
        {
            return Err(StoreError::InvalidCategory);
        }

        let now = chrono::Utc::now().to_rfc3339();

        let active = dispositivos::ActiveModel {
            nome: Set(nome),
            serial: Set(serial),
            status: Set(status.unwrap_or_else(|| STATUS_ATIVO.to_string())),
            categoria_id: Set(categoria_id),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let created = active
            .insert(&self.conn)
            .await
            .map_err(|e| remap_unique(e, StoreError::DuplicateSerial))?;

        self.get(created.id).await
    }

    pub async fn get(&self, id: i32) -> Result<DeviceRecord, StoreError> {
        Dispositivos::find_by_id(id)
            .find_also_related(Categorias)
            .one(&self.conn)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("Dispositivo {id} não encontrado")))
    }

    /// Partial update. Business rules are applied in order and the first
    /// failure aborts the whole operation; nothing is written until every
    /// supplied field has passed.
    pub async fn update(&self, id: i32, update: DeviceUpdate) -> Result<DeviceRecord, StoreError> {
        let record = self.get(id).await?;

        if update.nome.is_none()
            && update.serial.is_none()
            && update.status.is_none()
            && update.categoria_id.is_none()
        {
            return Ok(record);
        }
        let (current, _) = record;

        if let Some(novo_serial) = &update.serial
            && *novo_serial != current.serial
        {
            let collides = Dispositivos::find()
                .filter(dispositivos::Column::Serial.eq(novo_serial))
                .one(&self.conn)
                .await?;
            if collides.is_some() {
                return Err(StoreError::DuplicateSerial);
            }
        }

        // An explicit null clears the link and always succeeds; a non-null
        // id is revalidated against the categories table.
        if let Some(Some(cat_id)) = update.categoria_id
            && !self.categoria_exists(cat_id).await?
        {
            return Err(StoreError::InvalidCategory);
        }

        let mut active: dispositivos::ActiveModel = current.into();
        if let Some(nome) = update.nome {
            active.nome = Set(nome);
        }
        if let Some(serial) = update.serial {
            active.serial = Set(serial);
        }
        if let Some(status) = update.status {
            active.status = Set(status);
        }
        if let Some(categoria_id) = update.categoria_id {
            active.categoria_id = Set(categoria_id);
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let updated = active
            .update(&self.conn)
            .await
            .map_err(|e| remap_unique(e, StoreError::DuplicateSerial))?;

        self.get(updated.id).await
    }

    /// Delete is unconditional; devices carry no referential protection.
    pub async fn delete(&self, id: i32) -> Result<(), StoreError> {
        let (dispositivo, _) = self.get(id).await?;

        let active: dispositivos::ActiveModel = dispositivo.into();
        active.delete(&self.conn).await?;

        Ok(())
    }

    /// Filter, sort and paginate the device set.
    ///
    /// Filters are applied only when their value is meaningful: a status
    /// outside the enum is ignored (not an error), a non-positive category
    /// id is ignored, an empty search term is ignored. Totals are computed
    /// post-filter, pre-pagination; an out-of-range page yields an empty
    /// item set.
    pub async fn list(&self, query: DeviceListQuery) -> Result<DevicePage, StoreError> {
        let mut select = Dispositivos::find();

        if let Some(status) = &query.status
            && (status == STATUS_ATIVO || status == STATUS_INATIVO)
        {
            select = select.filter(dispositivos::Column::Status.eq(status.as_str()));
        }

        if let Some(cat_id) = query.categoria_id
            && cat_id > 0
        {
            select = select.filter(dispositivos::Column::CategoriaId.eq(cat_id));
        }

        if let Some(term) = &query.busca
            && !term.is_empty()
        {
            // SQLite LIKE is case-insensitive for ASCII.
            select = select.filter(
                Condition::any()
                    .add(dispositivos::Column::Nome.contains(term))
                    .add(dispositivos::Column::Serial.contains(term)),
            );
        }

        let column = sort_column(&query.sort);
        let select = if query.order.eq_ignore_ascii_case("desc") {
            select.order_by_desc(column)
        } else {
            select.order_by_asc(column)
        };

        let limit = if query.limit == 0 {
            DEFAULT_LIMIT
        } else {
            query.limit
        };
        let page = query.page.max(DEFAULT_PAGE);

        let paginator = select
            .find_also_related(Categorias)
            .paginate(&self.conn, limit);

        let total_records = paginator.num_items().await?;
        let total_pages = paginator.num_pages().await?;
        let items = paginator.fetch_page(page - 1).await?;

        Ok(DevicePage {
            items,
            total_records,
            total_pages,
            current_page: page,
            limit,
        })
    }
}
