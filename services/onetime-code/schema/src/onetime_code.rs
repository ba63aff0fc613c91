use sea_orm::entity::prelude::*;

/// One-time code bound to an (owner, type) pair.
/// Unique over (owner, type, code); rows older than the store TTL are purged by the reaper.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "onetime_code")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner: String,
    #[sea_orm(column_name = "type")]
    pub code_type: String,
    pub code: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
