use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, Statement, TransactionTrait,
};
use serde_json::Value;

use super::{RecordStore, StoreResult, Swap, holds, merge, record_id};
use crate::error::StoreError;
use crate::entity::records::{ActiveModel as RecordActive, Column as RecordCol, Entity as Records};

/// Postgres-backed store: one JSONB row per record in the `records` table.
#[derive(Debug, Clone)]
pub struct PgStore {
    orm: DatabaseConnection,
}

impl PgStore {
    pub fn new(orm: DatabaseConnection) -> Self {
        Self { orm }
    }
}

const NEXT_SEQUENCE_SQL: &str = "INSERT INTO record_sequences (name, value) VALUES ($1, $2) \
     ON CONFLICT (name) DO UPDATE SET value = record_sequences.value + 1 \
     RETURNING value";

fn key(collection: &str, id: &str) -> (String, String) {
    (collection.to_string(), id.to_string())
}

#[async_trait]
impl RecordStore for PgStore {
    async fn get_all(&self, collection: &str) -> StoreResult<Vec<Value>> {
        let rows = Records::find()
            .filter(RecordCol::Collection.eq(collection))
            .order_by_asc(RecordCol::CreatedAt)
            .order_by_asc(RecordCol::Id)
            .all(&self.orm)
            .await?;
        Ok(rows.into_iter().map(|row| row.data).collect())
    }

    async fn get_by_id(&self, collection: &str, id: &str) -> StoreResult<Option<Value>> {
        let row = Records::find_by_id(key(collection, id))
            .one(&self.orm)
            .await?;
        Ok(row.map(|row| row.data))
    }

    async fn create(&self, collection: &str, record: Value) -> StoreResult<Value> {
        let id = record_id(collection, &record)?.to_string();
        let now = Utc::now();
        RecordActive {
            collection: Set(collection.to_string()),
            id: Set(id),
            data: Set(record.clone()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&self.orm)
        .await?;
        Ok(record)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        partial: Value,
    ) -> StoreResult<Option<Value>> {
        let txn = self.orm.begin().await?;

        let existing = Records::find_by_id(key(collection, id))
            .lock(LockType::Update)
            .one(&txn)
            .await?;
        let Some(existing) = existing else {
            return Ok(None);
        };

        let mut data = existing.data.clone();
        merge(&mut data, partial);

        let mut active: RecordActive = existing.into();
        active.data = Set(data.clone());
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await?;

        txn.commit().await?;
        Ok(Some(data))
    }

    async fn update_if(
        &self,
        collection: &str,
        id: &str,
        expected: &Value,
        partial: Value,
    ) -> StoreResult<Swap<Value>> {
        let txn = self.orm.begin().await?;

        let existing = Records::find_by_id(key(collection, id))
            .lock(LockType::Update)
            .one(&txn)
            .await?;
        let Some(existing) = existing else {
            return Ok(Swap::Missing);
        };
        if !holds(&existing.data, expected) {
            return Ok(Swap::Stale);
        }

        let mut data = existing.data.clone();
        merge(&mut data, partial);

        let mut active: RecordActive = existing.into();
        active.data = Set(data.clone());
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await?;

        txn.commit().await?;
        Ok(Swap::Done(data))
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        let result = Records::delete_by_id(key(collection, id))
            .exec(&self.orm)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn clear(&self, collection: &str) -> StoreResult<()> {
        Records::delete_many()
            .filter(RecordCol::Collection.eq(collection))
            .exec(&self.orm)
            .await?;
        Ok(())
    }

    async fn next_sequence(&self, name: &str, start: i64) -> StoreResult<i64> {
        let row = self
            .orm
            .query_one(Statement::from_sql_and_values(
                DbBackend::Postgres,
                NEXT_SEQUENCE_SQL,
                [name.into(), start.into()],
            ))
            .await?
            .ok_or_else(|| StoreError::Corrupt {
                collection: "record_sequences".to_string(),
                reason: format!("sequence {name} returned no row"),
            })?;
        Ok(row.try_get::<i64>("", "value")?)
    }
}
