use std::sync::Arc;

use crate::{
    config::AppConfig,
    locks::LockRegistry,
    repositories::{
        BannerRepository, CartRepository, CategoryRepository, ComboRepository, OrderRepository,
        ProductRepository, UserRepository,
    },
    store::{MemoryStore, RecordStore},
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub config: Arc<AppConfig>,
    pub locks: Arc<LockRegistry>,
    pub products: ProductRepository,
    pub categories: CategoryRepository,
    pub combos: ComboRepository,
    pub banners: BannerRepository,
    pub carts: CartRepository,
    pub orders: OrderRepository,
    pub users: UserRepository,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, config: AppConfig) -> Self {
        let orders = OrderRepository::new(store.clone(), config.shop.order_code_prefix.clone());
        Self {
            products: ProductRepository::new(store.clone()),
            categories: CategoryRepository::new(store.clone()),
            combos: ComboRepository::new(store.clone()),
            banners: BannerRepository::new(store.clone()),
            carts: CartRepository::new(store.clone()),
            users: UserRepository::new(store.clone()),
            orders,
            locks: Arc::new(LockRegistry::default()),
            config: Arc::new(config),
            store,
        }
    }

    pub fn in_memory(config: AppConfig) -> Self {
        Self::new(Arc::new(MemoryStore::new()), config)
    }
}
