use std::sync::Arc;

use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Banner, Category, Combo, Paginated, Product, ProductFilter, Variant},
    store::{Collection, RecordStore, Swap},
};

#[derive(Clone)]
pub struct ProductRepository {
    records: Collection<Product>,
}

impl ProductRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            records: Collection::new(store),
        }
    }

    pub async fn all(&self) -> AppResult<Vec<Product>> {
        self.records.all().await
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Product>> {
        self.records.get(&id.to_string()).await
    }

    pub async fn get_by_slug(&self, slug: &str) -> AppResult<Option<Product>> {
        let products = self.records.all().await?;
        Ok(products.into_iter().find(|p| p.slug == slug))
    }

    /// Active products of a category.
    pub async fn get_by_category(&self, category_id: Uuid) -> AppResult<Vec<Product>> {
        let products = self.records.all().await?;
        Ok(products
            .into_iter()
            .filter(|p| p.category_id == category_id && p.active)
            .collect())
    }

    pub async fn get_featured(&self, limit: Option<usize>) -> AppResult<Vec<Product>> {
        let featured = self
            .records
            .all()
            .await?
            .into_iter()
            .filter(|p| p.featured && p.active);
        Ok(match limit {
            Some(limit) => featured.take(limit).collect(),
            None => featured.collect(),
        })
    }

    pub async fn filter(
        &self,
        filter: &ProductFilter,
        page: i64,
        limit: i64,
    ) -> AppResult<Paginated<Product>> {
        let active = filter.active.unwrap_or(true);
        let search = filter
            .search
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let products = self
            .records
            .all()
            .await?
            .into_iter()
            .filter(|p| p.active == active)
            .filter(|p| filter.category_id.is_none_or(|c| p.category_id == c))
            .filter(|p| filter.min_price.is_none_or(|min| p.price >= min))
            .filter(|p| filter.max_price.is_none_or(|max| p.price <= max))
            .filter(|p| {
                search.as_ref().is_none_or(|needle| {
                    p.name.to_lowercase().contains(needle)
                        || p.description.to_lowercase().contains(needle)
                })
            })
            .filter(|p| filter.featured.is_none_or(|f| p.featured == f))
            .collect();

        Ok(Paginated::from_vec(products, page, limit))
    }

    /// Sum of all variant stock; zero for a missing or variantless product.
    pub async fn total_stock(&self, id: Uuid) -> AppResult<i64> {
        Ok(self
            .get_by_id(id)
            .await?
            .map(|p| p.total_stock())
            .unwrap_or(0))
    }

    pub async fn create(&self, product: &Product) -> AppResult<Product> {
        self.records.insert(product).await
    }

    /// Saves `product` only while the stored variants still equal `seen`,
    /// the variants the caller read before changing it.
    pub async fn save_if_variants(
        &self,
        product: &Product,
        seen: &[Variant],
    ) -> AppResult<Swap<Product>> {
        let expected = serde_json::json!({ "variants": serde_json::to_value(seen)? });
        self.records.save_if(product, &expected).await
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<bool> {
        self.records.remove(&id.to_string()).await
    }
}

#[derive(Clone)]
pub struct CategoryRepository {
    records: Collection<Category>,
}

impl CategoryRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            records: Collection::new(store),
        }
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Category>> {
        self.records.get(&id.to_string()).await
    }

    pub async fn get_by_slug(&self, slug: &str) -> AppResult<Option<Category>> {
        let categories = self.records.all().await?;
        Ok(categories.into_iter().find(|c| c.slug == slug))
    }

    pub async fn get_ordered(&self) -> AppResult<Vec<Category>> {
        let mut categories = self.records.all().await?;
        categories.sort_by_key(|c| c.order);
        Ok(categories)
    }

    pub async fn create(&self, category: &Category) -> AppResult<Category> {
        self.records.insert(category).await
    }

    pub async fn save(&self, category: &Category) -> AppResult<Option<Category>> {
        self.records.save(category).await
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<bool> {
        self.records.remove(&id.to_string()).await
    }
}

#[derive(Clone)]
pub struct ComboRepository {
    records: Collection<Combo>,
}

impl ComboRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            records: Collection::new(store),
        }
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Combo>> {
        self.records.get(&id.to_string()).await
    }

    pub async fn get_by_slug(&self, slug: &str) -> AppResult<Option<Combo>> {
        let combos = self.records.all().await?;
        Ok(combos.into_iter().find(|c| c.slug == slug))
    }

    pub async fn get_featured(&self, limit: Option<usize>) -> AppResult<Vec<Combo>> {
        let featured = self
            .records
            .all()
            .await?
            .into_iter()
            .filter(|c| c.featured && c.active);
        Ok(match limit {
            Some(limit) => featured.take(limit).collect(),
            None => featured.collect(),
        })
    }

    pub async fn get_active(&self, page: i64, limit: i64) -> AppResult<Paginated<Combo>> {
        let combos = self
            .records
            .all()
            .await?
            .into_iter()
            .filter(|c| c.active)
            .collect();
        Ok(Paginated::from_vec(combos, page, limit))
    }

    pub async fn create(&self, combo: &Combo) -> AppResult<Combo> {
        self.records.insert(combo).await
    }

    pub async fn save(&self, combo: &Combo) -> AppResult<Option<Combo>> {
        self.records.save(combo).await
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<bool> {
        self.records.remove(&id.to_string()).await
    }
}

#[derive(Clone)]
pub struct BannerRepository {
    records: Collection<Banner>,
}

impl BannerRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            records: Collection::new(store),
        }
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Banner>> {
        self.records.get(&id.to_string()).await
    }

    pub async fn get_active(&self) -> AppResult<Vec<Banner>> {
        let mut banners: Vec<Banner> = self
            .records
            .all()
            .await?
            .into_iter()
            .filter(|b| b.active)
            .collect();
        banners.sort_by_key(|b| b.order);
        Ok(banners)
    }

    pub async fn get_ordered(&self) -> AppResult<Vec<Banner>> {
        let mut banners = self.records.all().await?;
        banners.sort_by_key(|b| b.order);
        Ok(banners)
    }

    pub async fn create(&self, banner: &Banner) -> AppResult<Banner> {
        self.records.insert(banner).await
    }

    pub async fn save(&self, banner: &Banner) -> AppResult<Option<Banner>> {
        self.records.save(banner).await
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<bool> {
        self.records.remove(&id.to_string()).await
    }
}
