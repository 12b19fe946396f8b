use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "categorias")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub nome: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub descricao: Option<String>,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::dispositivos::Entity")]
    Dispositivos,
}

impl Related<super::dispositivos::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Dispositivos.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
