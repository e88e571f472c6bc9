use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateQuantityRequest {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RemoveItemRequest {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub combo_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddComboRequest {
    pub combo_id: Uuid,
}
