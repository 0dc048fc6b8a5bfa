use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::{order, order_item, product, OrderStatus};
use crate::errors::ServiceError;

/// Product details as they appear in an order line.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderLineProduct {
    pub name: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderLine {
    pub id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub product: Option<OrderLineProduct>,
}

/// Shipping address snapshot taken at checkout.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ShippingSnapshot {
    pub street: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub zip_code: String,
}

impl From<&order::Model> for ShippingSnapshot {
    fn from(model: &order::Model) -> Self {
        Self {
            street: model.shipping_street.clone(),
            city: model.shipping_city.clone(),
            state: model.shipping_state.clone(),
            country: model.shipping_country.clone(),
            zip_code: model.shipping_zip_code.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderSummary {
    pub id: Uuid,
    pub order_number: String,
    pub status: OrderStatus,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
    pub shipping_address: ShippingSnapshot,
    pub items: Vec<OrderLine>,
}

/// Read-only order history for the storefront's account pages.
#[derive(Clone)]
pub struct OrderHistoryService {
    db: Arc<DbPool>,
}

impl OrderHistoryService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Lists the user's orders, newest first, each with its line items and
    /// the product name/image for every line.
    #[instrument(skip(self))]
    pub async fn list_orders(&self, user_id: Uuid) -> Result<Vec<OrderSummary>, ServiceError> {
        let orders = order::Entity::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let mut summaries = Vec::with_capacity(orders.len());
        for order_model in orders {
            let lines = order_item::Entity::find()
                .filter(order_item::Column::OrderId.eq(order_model.id))
                .find_also_related(product::Entity)
                .all(&*self.db)
                .await?;

            let items = lines
                .into_iter()
                .map(|(item, product)| OrderLine {
                    id: item.id,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    product: product.map(|p| OrderLineProduct {
                        name: p.name,
                        image: p.image,
                    }),
                })
                .collect();

            summaries.push(OrderSummary {
                id: order_model.id,
                order_number: order_model.order_number.clone(),
                status: order_model.status.clone(),
                total: order_model.total,
                created_at: order_model.created_at,
                shipping_address: ShippingSnapshot::from(&order_model),
                items,
            });
        }

        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_copies_all_shipping_fields() {
        let model = order::Model {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            order_number: "ORD-1001".to_string(),
            status: OrderStatus::Pending,
            total: Decimal::new(1999, 2),
            shipping_street: "1 Main St".to_string(),
            shipping_city: "Springfield".to_string(),
            shipping_state: "IL".to_string(),
            shipping_country: "US".to_string(),
            shipping_zip_code: "62704".to_string(),
            created_at: Utc::now(),
        };

        let snapshot = ShippingSnapshot::from(&model);
        assert_eq!(snapshot.street, "1 Main St");
        assert_eq!(snapshot.city, "Springfield");
        assert_eq!(snapshot.zip_code, "62704");
    }
}
