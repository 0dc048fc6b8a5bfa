use std::sync::Arc;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::{address, user};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

const ADDRESS_NOT_FOUND: &str = "Address not found";

/// Fields supplied when creating or replacing an address. The default flag is
/// never accepted from callers; it is managed by this service.
#[derive(Clone, Debug)]
pub struct AddressInput {
    pub street: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub zip_code: String,
}

/// Shipping-address book. Maintains the invariant that a user with at least
/// one address has exactly one default.
#[derive(Clone)]
pub struct AddressService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl AddressService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!("Failed to emit address event: {e}");
            }
        }
    }

    /// Lists the user's addresses, default first, then oldest first.
    #[instrument(skip(self))]
    pub async fn list_addresses(&self, user_id: Uuid) -> Result<Vec<address::Model>, ServiceError> {
        let addresses = address::Entity::find()
            .filter(address::Column::UserId.eq(user_id))
            .order_by_desc(address::Column::IsDefault)
            .order_by_asc(address::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(addresses)
    }

    /// Creates an address. The user's first address becomes the default
    /// automatically.
    #[instrument(skip(self, input))]
    pub async fn create_address(
        &self,
        user_id: Uuid,
        input: AddressInput,
    ) -> Result<address::Model, ServiceError> {
        let txn = self.db.begin().await?;

        // A session can outlive its account; never insert for a vanished user.
        user::Entity::find_by_id(user_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        let existing_count = address::Entity::find()
            .filter(address::Column::UserId.eq(user_id))
            .count(&txn)
            .await?;

        let model = address::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            street: Set(input.street),
            city: Set(input.city),
            state: Set(input.state),
            country: Set(input.country),
            zip_code: Set(input.zip_code),
            is_default: Set(existing_count == 0),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };

        let created = model.insert(&txn).await?;
        txn.commit().await?;

        self.emit(Event::AddressCreated {
            user_id,
            address_id: created.id,
        })
        .await;

        Ok(created)
    }

    /// Replaces the address fields of an owned address. The default flag is
    /// left untouched; use [`set_default`](Self::set_default) to move it.
    #[instrument(skip(self, input))]
    pub async fn update_address(
        &self,
        user_id: Uuid,
        address_id: Uuid,
        input: AddressInput,
    ) -> Result<address::Model, ServiceError> {
        let existing = address::Entity::find_by_id(address_id)
            .filter(address::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(ADDRESS_NOT_FOUND.to_string()))?;

        let mut active: address::ActiveModel = existing.into();
        active.street = Set(input.street);
        active.city = Set(input.city);
        active.state = Set(input.state);
        active.country = Set(input.country);
        active.zip_code = Set(input.zip_code);

        let updated = active.update(&*self.db).await?;

        self.emit(Event::AddressUpdated {
            user_id,
            address_id: updated.id,
        })
        .await;

        Ok(updated)
    }

    /// Deletes an owned address. When the deleted address was the default and
    /// others remain, the oldest remaining address is promoted in the same
    /// transaction.
    #[instrument(skip(self))]
    pub async fn delete_address(&self, user_id: Uuid, address_id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;

        let existing = address::Entity::find_by_id(address_id)
            .filter(address::Column::UserId.eq(user_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(ADDRESS_NOT_FOUND.to_string()))?;

        let was_default = existing.is_default;
        address::Entity::delete_by_id(address_id).exec(&txn).await?;

        if was_default {
            let successor = address::Entity::find()
                .filter(address::Column::UserId.eq(user_id))
                .order_by_asc(address::Column::CreatedAt)
                .order_by_asc(address::Column::Id)
                .one(&txn)
                .await?;

            if let Some(successor) = successor {
                let mut active: address::ActiveModel = successor.into();
                active.is_default = Set(true);
                active.update(&txn).await?;
            }
        }

        txn.commit().await?;

        self.emit(Event::AddressDeleted {
            user_id,
            address_id,
        })
        .await;

        Ok(())
    }

    /// Makes an owned address the single default: every other address of the
    /// user is cleared first, in one transaction.
    #[instrument(skip(self))]
    pub async fn set_default(
        &self,
        user_id: Uuid,
        address_id: Uuid,
    ) -> Result<address::Model, ServiceError> {
        let txn = self.db.begin().await?;

        let existing = address::Entity::find_by_id(address_id)
            .filter(address::Column::UserId.eq(user_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(ADDRESS_NOT_FOUND.to_string()))?;

        address::Entity::update_many()
            .col_expr(address::Column::IsDefault, Expr::value(false))
            .filter(address::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;

        let mut active: address::ActiveModel = existing.into();
        active.is_default = Set(true);
        let updated = active.update(&txn).await?;

        txn.commit().await?;

        self.emit(Event::DefaultAddressChanged {
            user_id,
            address_id: updated.id,
        })
        .await;

        Ok(updated)
    }
}
