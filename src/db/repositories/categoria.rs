use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};

use crate::db::{StoreError, remap_unique};
use crate::entities::{categorias, dispositivos, prelude::*};

pub struct CategoriaRepository {
    conn: DatabaseConnection,
}

impl CategoriaRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Create a category, enforcing name uniqueness.
    pub async fn create(
        &self,
        nome: String,
        descricao: Option<String>,
    ) -> Result<categorias::Model, StoreError> {
        let exists = Categorias::find()
            .filter(categorias::Column::Nome.eq(&nome))
            .one(&self.conn)
            .await?;

        if exists.is_some() {
            return Err(StoreError::DuplicateName);
        }

        let now = chrono::Utc::now().to_rfc3339();

        let active = categorias::ActiveModel {
            nome: Set(nome),
            descricao: Set(descricao),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let created = active
            .insert(&self.conn)
            .await
            .map_err(|e| remap_unique(e, StoreError::DuplicateName))?;

        Ok(created)
    }

    pub async fn list(&self) -> Result<Vec<categorias::Model>, StoreError> {
        let all = Categorias::find().all(&self.conn).await?;
        Ok(all)
    }

    pub async fn get(&self, id: i32) -> Result<categorias::Model, StoreError> {
        Categorias::find_by_id(id)
            .one(&self.conn)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("Categoria {id} não encontrada")))
    }

    /// Partial update. `descricao` uses present-vs-absent semantics: a
    /// supplied key overwrites (even with null), an absent key leaves the
    /// current value untouched.
    pub async fn update(
        &self,
        id: i32,
        nome: Option<String>,
        descricao: Option<Option<String>>,
    ) -> Result<categorias::Model, StoreError> {
        let current = self.get(id).await?;

        if nome.is_none() && descricao.is_none() {
            return Ok(current);
        }

        if let Some(novo_nome) = &nome
            && *novo_nome != current.nome
        {
            let collides = Categorias::find()
                .filter(categorias::Column::Nome.eq(novo_nome))
                .one(&self.conn)
                .await?;
            if collides.is_some() {
                return Err(StoreError::DuplicateName);
            }
        }

        let mut active: categorias::ActiveModel = current.into();
        if let Some(novo_nome) = nome {
            active.nome = Set(novo_nome);
        }
        if let Some(nova_descricao) = descricao {
            active.descricao = Set(nova_descricao);
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let updated = active
            .update(&self.conn)
            .await
            .map_err(|e| remap_unique(e, StoreError::DuplicateName))?;

        Ok(updated)
    }

    /// Delete a category, blocked while any device still references it.
    pub async fn delete(&self, id: i32) -> Result<(), StoreError> {
        let categoria = self.get(id).await?;

        let linked = Dispositivos::find()
            .filter(dispositivos::Column::CategoriaId.eq(id))
            .count(&self.conn)
            .await?;

        if linked > 0 {
            return Err(StoreError::HasDependents);
        }

        let active: categorias::ActiveModel = categoria.into();
        active.delete(&self.conn).await?;

        Ok(())
    }
}
