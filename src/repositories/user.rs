use std::sync::Arc;

use uuid::Uuid;

use crate::{
    error::AppResult,
    models::User,
    store::{Collection, RecordStore},
};

#[derive(Clone)]
pub struct UserRepository {
    records: Collection<User>,
}

impl UserRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            records: Collection::new(store),
        }
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        self.records.get(&id.to_string()).await
    }

    pub async fn get_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let users = self.records.all().await?;
        Ok(users
            .into_iter()
            .find(|u| u.email.eq_ignore_ascii_case(email)))
    }

    pub async fn get_by_phone(&self, phone: &str) -> AppResult<Option<User>> {
        let users = self.records.all().await?;
        Ok(users.into_iter().find(|u| u.phone == phone))
    }

    pub async fn create(&self, user: &User) -> AppResult<User> {
        self.records.insert(user).await
    }
}
