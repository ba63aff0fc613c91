use anyhow::Context as _;
use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::{Index, IndexCreateStatement, Query};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, Schema, SqlErr,
};
use tracing::debug;
use uuid::Uuid;

use onetime_code_schema::onetime_code;

use crate::domain::repository::CodeStorage;
use crate::domain::types::CodeRecord;
use crate::error::StorageError;

const UNIQUE_INDEX: &str = "idx_onetime_code_owner_type_code";
const EXPIRY_INDEX: &str = "idx_onetime_code_created_at";

/// PostgreSQL-backed code storage.
///
/// Uniqueness is a composite unique index. Postgres has no TTL index, so
/// physical expiry is left to the reaper calling `purge_expired`.
#[derive(Clone)]
pub struct DbCodeStorage {
    pub db: DatabaseConnection,
}

impl DbCodeStorage {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl CodeStorage for DbCodeStorage {
    async fn build_index(&self, _ttl: Duration) -> Result<(), StorageError> {
        let backend = self.db.get_database_backend();
        let schema = Schema::new(backend);

        let mut table = schema.create_table_from_entity(onetime_code::Entity);
        table.if_not_exists();
        self.db
            .execute(backend.build(&table))
            .await
            .context("create onetime_code table")?;

        for index in [unique_index(), expiry_index()] {
            self.db
                .execute(backend.build(&index))
                .await
                .context("create onetime_code index")?;
        }
        debug!("onetime_code table and indexes ensured");
        Ok(())
    }

    async fn insert(&self, record: &CodeRecord, _ttl: Duration) -> Result<(), StorageError> {
        onetime_code::ActiveModel {
            id: Set(Uuid::new_v4()),
            owner: Set(record.owner.clone()),
            code_type: Set(record.code_type.clone()),
            code: Set(record.code.clone()),
            created_at: Set(record.created_at),
        }
        .insert(&self.db)
        .await
        .map_err(insert_error)?;
        Ok(())
    }

    async fn find(
        &self,
        owner: &str,
        code_type: &str,
        code: &str,
    ) -> Result<Option<CodeRecord>, StorageError> {
        let model = onetime_code::Entity::find()
            .filter(onetime_code::Column::Owner.eq(owner))
            .filter(onetime_code::Column::CodeType.eq(code_type))
            .filter(onetime_code::Column::Code.eq(code))
            .one(&self.db)
            .await
            .context("find onetime code")?;
        Ok(model.map(record_from_model))
    }

    async fn take(
        &self,
        owner: &str,
        code_type: &str,
        code: &str,
    ) -> Result<Option<CodeRecord>, StorageError> {
        // Single DELETE ... RETURNING so concurrent takers cannot both see the row.
        let delete = Query::delete()
            .from_table(onetime_code::Entity)
            .and_where(onetime_code::Column::Owner.eq(owner))
            .and_where(onetime_code::Column::CodeType.eq(code_type))
            .and_where(onetime_code::Column::Code.eq(code))
            .returning_all()
            .to_owned();
        let model = onetime_code::Entity::find()
            .from_raw_sql(self.db.get_database_backend().build(&delete))
            .one(&self.db)
            .await
            .context("take onetime code")?;
        Ok(model.map(record_from_model))
    }

    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, StorageError> {
        let result = onetime_code::Entity::delete_many()
            .filter(onetime_code::Column::CreatedAt.lte(cutoff))
            .exec(&self.db)
            .await
            .context("purge expired onetime codes")?;
        Ok(result.rows_affected)
    }
}

fn unique_index() -> IndexCreateStatement {
    Index::create()
        .name(UNIQUE_INDEX)
        .table(onetime_code::Entity)
        .col(onetime_code::Column::Owner)
        .col(onetime_code::Column::CodeType)
        .col(onetime_code::Column::Code)
        .unique()
        .if_not_exists()
        .to_owned()
}

fn expiry_index() -> IndexCreateStatement {
    Index::create()
        .name(EXPIRY_INDEX)
        .table(onetime_code::Entity)
        .col(onetime_code::Column::CreatedAt)
        .if_not_exists()
        .to_owned()
}

fn insert_error(err: DbErr) -> StorageError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => StorageError::UniqueViolation,
        _ => StorageError::Backend(anyhow::Error::new(err).context("insert onetime code")),
    }
}

fn record_from_model(model: onetime_code::Model) -> CodeRecord {
    CodeRecord {
        owner: model.owner,
        code_type: model.code_type,
        code: model.code,
        created_at: model.created_at,
    }
}
