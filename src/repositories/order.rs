use std::{collections::HashSet, sync::Arc};

use chrono::{DateTime, Datelike, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Order, OrderFilter, OrderStats, OrderStatus, Paginated, StatusEntry},
    store::{Collection, RecordStore, Swap},
};

#[derive(Clone)]
pub struct OrderRepository {
    store: Arc<dyn RecordStore>,
    records: Collection<Order>,
    prefix: String,
    /// Years whose counter this process already seeded.
    seeded: Arc<Mutex<HashSet<i32>>>,
}

pub fn format_order_code(prefix: &str, year: i32, sequence: i64) -> String {
    format!("{prefix}-{year}-{sequence:04}")
}

fn in_range(order: &Order, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> bool {
    from.is_none_or(|from| order.created_at >= from) && to.is_none_or(|to| order.created_at <= to)
}

impl OrderRepository {
    pub fn new(store: Arc<dyn RecordStore>, prefix: impl Into<String>) -> Self {
        Self {
            records: Collection::new(store.clone()),
            store,
            prefix: prefix.into(),
            seeded: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub async fn all(&self) -> AppResult<Vec<Order>> {
        self.records.all().await
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Order>> {
        self.records.get(&id.to_string()).await
    }

    pub async fn get_by_code(&self, order_code: &str) -> AppResult<Option<Order>> {
        let orders = self.records.all().await?;
        Ok(orders.into_iter().find(|o| o.order_code == order_code))
    }

    /// Orders of one user, newest first.
    pub async fn get_by_user(&self, user_id: Uuid) -> AppResult<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .records
            .all()
            .await?
            .into_iter()
            .filter(|o| o.user_id == Some(user_id))
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    pub async fn get_by_status(&self, status: OrderStatus) -> AppResult<Vec<Order>> {
        let orders = self.records.all().await?;
        Ok(orders.into_iter().filter(|o| o.status == status).collect())
    }

    pub async fn filter(
        &self,
        filter: &OrderFilter,
        page: i64,
        limit: i64,
    ) -> AppResult<Paginated<Order>> {
        let search = filter.search.as_deref().filter(|s| !s.is_empty());
        let search_lower = search.map(str::to_lowercase);

        let mut orders: Vec<Order> = self
            .records
            .all()
            .await?
            .into_iter()
            .filter(|o| filter.status.is_none_or(|s| o.status == s))
            .filter(|o| filter.user_id.is_none_or(|u| o.user_id == Some(u)))
            .filter(|o| in_range(o, filter.date_from, filter.date_to))
            .filter(|o| match (search, search_lower.as_deref()) {
                (Some(raw), Some(lower)) => {
                    o.order_code.to_lowercase().contains(lower)
                        || o.customer.full_name.to_lowercase().contains(lower)
                        || o.customer.phone.contains(raw)
                }
                _ => true,
            })
            .collect();

        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(Paginated::from_vec(orders, page, limit))
    }

    pub async fn create(&self, order: &Order) -> AppResult<Order> {
        self.records.insert(order).await
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<bool> {
        self.records.remove(&id.to_string()).await
    }

    /// Moves the order from `from` to `to` and appends the matching history
    /// entry. The write only lands while the stored status is still `from`;
    /// otherwise another writer got there first and `Conflict` is returned.
    pub async fn update_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        note: Option<String>,
    ) -> AppResult<Option<Order>> {
        let Some(mut order) = self.get_by_id(id).await? else {
            return Ok(None);
        };
        if order.status != from {
            return Err(status_conflict(&order.order_code));
        }

        let now = Utc::now();
        order.status = to;
        order.status_history.push(StatusEntry {
            status: to,
            timestamp: now,
            note,
        });
        order.updated_at = now;

        let expected = serde_json::json!({ "status": serde_json::to_value(from)? });
        match self.records.save_if(&order, &expected).await? {
            Swap::Done(order) => Ok(Some(order)),
            Swap::Missing => Ok(None),
            Swap::Stale => Err(status_conflict(&order.order_code)),
        }
    }

    /// Next `PREFIX-YEAR-NNNN` code from the store's per-year counter. The
    /// first use of a year seeds the counter from the highest stored code.
    pub async fn generate_order_code(&self, now: DateTime<Utc>) -> AppResult<String> {
        let year = now.year();
        let name = format!("order_code:{}-{year}", self.prefix);

        let mut seeded = self.seeded.lock().await;
        let start = if seeded.contains(&year) {
            1
        } else {
            self.highest_sequence(year).await? + 1
        };
        let sequence = self.store.next_sequence(&name, start).await?;
        seeded.insert(year);

        Ok(format_order_code(&self.prefix, year, sequence))
    }

    async fn highest_sequence(&self, year: i32) -> AppResult<i64> {
        let year_prefix = format!("{}-{year}-", self.prefix);
        let orders = self.records.all().await?;
        Ok(orders
            .iter()
            .filter_map(|o| o.order_code.strip_prefix(&year_prefix))
            .filter_map(|seq| seq.parse::<i64>().ok())
            .max()
            .unwrap_or(0))
    }

    pub async fn stats(
        &self,
        date_from: Option<DateTime<Utc>>,
        date_to: Option<DateTime<Utc>>,
    ) -> AppResult<OrderStats> {
        let orders = self.records.all().await?;
        Ok(compute_stats(
            orders.iter().filter(|o| in_range(o, date_from, date_to)),
        ))
    }
}

fn status_conflict(order_code: &str) -> AppError {
    AppError::Conflict(format!("order {order_code} changed concurrently"))
}

/// Revenue and average exclude cancelled orders; the average is zero when
/// nothing counts toward it.
pub fn compute_stats<'a>(orders: impl Iterator<Item = &'a Order>) -> OrderStats {
    let mut stats = OrderStats::default();
    for order in orders {
        stats.total_orders += 1;
        match order.status {
            OrderStatus::Pending => stats.pending_orders += 1,
            OrderStatus::Processing => stats.processing_orders += 1,
            OrderStatus::Shipped => stats.shipped_orders += 1,
            OrderStatus::Delivered => stats.delivered_orders += 1,
            OrderStatus::Cancelled => stats.cancelled_orders += 1,
        }
        if order.status != OrderStatus::Cancelled {
            stats.total_revenue += order.total;
        }
    }

    let counted = stats.total_orders - stats.cancelled_orders;
    stats.average_order_value = if counted > 0 {
        stats.total_revenue as f64 / counted as f64
    } else {
        0.0
    };
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_code_is_zero_padded() {
        assert_eq!(format_order_code("NOEL", 2024, 7), "NOEL-2024-0007");
        assert_eq!(format_order_code("NOEL", 2024, 12345), "NOEL-2024-12345");
    }

    #[test]
    fn stats_of_nothing_are_zero() {
        let stats = compute_stats(std::iter::empty());
        assert_eq!(stats, OrderStats::default());
        assert_eq!(stats.average_order_value, 0.0);
    }
}
