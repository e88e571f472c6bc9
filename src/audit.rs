use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::AppResult,
    store::{Collection, Record, RecordStore},
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditEntry {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub resource: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl Record for AuditEntry {
    const COLLECTION: &'static str = "audit_logs";

    fn record_id(&self) -> String {
        self.id.to_string()
    }
}

pub async fn log_audit(
    store: &Arc<dyn RecordStore>,
    user_id: Option<Uuid>,
    action: &str,
    resource: Option<&str>,
    metadata: Option<Value>,
) -> AppResult<()> {
    let entry = AuditEntry {
        id: Uuid::new_v4(),
        user_id,
        action: action.to_string(),
        resource: resource.map(str::to_string),
        metadata,
        created_at: Utc::now(),
    };
    Collection::<AuditEntry>::new(store.clone())
        .insert(&entry)
        .await?;

    Ok(())
}

pub async fn list_audit(store: &Arc<dyn RecordStore>) -> AppResult<Vec<AuditEntry>> {
    Collection::<AuditEntry>::new(store.clone()).all().await
}
