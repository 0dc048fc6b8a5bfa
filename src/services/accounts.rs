use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QuerySelect, Set, TransactionTrait,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::{hash_password, verify_password};
use crate::db::DbPool;
use crate::entities::{
    address, cart, cart_item, order, order_item, user, user_settings, wishlist, wishlist_item,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

const USER_NOT_FOUND: &str = "User not found";
const SETTINGS_NOT_FOUND: &str = "Settings not found";
const CURRENT_PASSWORD_INCORRECT: &str = "Current password is incorrect";
const PASSWORD_INCORRECT: &str = "Password is incorrect";

/// Profile field changes. All fields optional; absent fields are untouched.
#[derive(Clone, Debug, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub image: Option<String>,
    pub new_password: Option<String>,
    pub current_password: Option<String>,
}

/// Notification preference changes. Absent fields are untouched.
#[derive(Clone, Debug, Default)]
pub struct SettingsUpdate {
    pub email_notifications: Option<bool>,
    pub order_updates: Option<bool>,
    pub marketing_emails: Option<bool>,
    pub security_alerts: Option<bool>,
}

/// Profile, notification settings, and account deletion.
#[derive(Clone)]
pub struct AccountService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl AccountService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!("Failed to emit account event: {e}");
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn get_profile(&self, user_id: Uuid) -> Result<user::Model, ServiceError> {
        user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(USER_NOT_FOUND.to_string()))
    }

    /// Applies profile changes. Setting a new password requires the current
    /// one; changing email enforces uniqueness.
    #[instrument(skip(self, update))]
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        update: ProfileUpdate,
    ) -> Result<user::Model, ServiceError> {
        let existing = user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(USER_NOT_FOUND.to_string()))?;

        let new_password_hash = match &update.new_password {
            Some(new_password) => {
                let current = update.current_password.as_deref().ok_or_else(|| {
                    ServiceError::ValidationError(
                        "Current password is required to set a new password".to_string(),
                    )
                })?;
                if !verify_password(current, &existing.password_hash)? {
                    return Err(ServiceError::InvalidCredential(
                        CURRENT_PASSWORD_INCORRECT.to_string(),
                    ));
                }
                Some(hash_password(new_password)?)
            }
            None => None,
        };

        if let Some(email) = &update.email {
            if email != &existing.email {
                let taken = user::Entity::find()
                    .filter(user::Column::Email.eq(email.as_str()))
                    .filter(user::Column::Id.ne(user_id))
                    .one(&*self.db)
                    .await?
                    .is_some();
                if taken {
                    return Err(ServiceError::ValidationError(
                        "Email is already in use".to_string(),
                    ));
                }
            }
        }

        let mut active: user::ActiveModel = existing.into();
        if let Some(name) = update.name {
            active.name = Set(name);
        }
        if let Some(email) = update.email {
            active.email = Set(email);
        }
        if let Some(image) = update.image {
            active.image = Set(Some(image));
        }
        if let Some(hash) = new_password_hash {
            active.password_hash = Set(hash);
        }

        let updated = active.update(&*self.db).await?;

        self.emit(Event::ProfileUpdated { user_id }).await;

        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn get_settings(&self, user_id: Uuid) -> Result<user_settings::Model, ServiceError> {
        user_settings::Entity::find()
            .filter(user_settings::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(SETTINGS_NOT_FOUND.to_string()))
    }

    /// Applies settings changes, creating the settings row with defaults on
    /// first write.
    #[instrument(skip(self, update))]
    pub async fn update_settings(
        &self,
        user_id: Uuid,
        update: SettingsUpdate,
    ) -> Result<user_settings::Model, ServiceError> {
        let existing = user_settings::Entity::find()
            .filter(user_settings::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?;

        let updated = match existing {
            Some(settings) => {
                let mut active: user_settings::ActiveModel = settings.into();
                if let Some(value) = update.email_notifications {
                    active.email_notifications = Set(value);
                }
                if let Some(value) = update.order_updates {
                    active.order_updates = Set(value);
                }
                if let Some(value) = update.marketing_emails {
                    active.marketing_emails = Set(value);
                }
                if let Some(value) = update.security_alerts {
                    active.security_alerts = Set(value);
                }
                active.update(&*self.db).await?
            }
            None => {
                let active = user_settings::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user_id),
                    email_notifications: Set(update.email_notifications.unwrap_or(true)),
                    order_updates: Set(update.order_updates.unwrap_or(true)),
                    marketing_emails: Set(update.marketing_emails.unwrap_or(false)),
                    security_alerts: Set(update.security_alerts.unwrap_or(true)),
                    updated_at: Set(None),
                };
                active.insert(&*self.db).await?
            }
        };

        self.emit(Event::SettingsUpdated { user_id }).await;

        Ok(updated)
    }

    /// Deletes the account and everything it owns, after verifying the
    /// caller's password. Children are removed before parents in a single
    /// transaction: cart items, carts, wishlist items, wishlists, addresses,
    /// order items, orders, settings, then the user row.
    #[instrument(skip(self, password))]
    pub async fn delete_account(&self, user_id: Uuid, password: &str) -> Result<(), ServiceError> {
        let existing = user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(USER_NOT_FOUND.to_string()))?;

        if !verify_password(password, &existing.password_hash)? {
            return Err(ServiceError::InvalidCredential(
                PASSWORD_INCORRECT.to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let cart_ids: Vec<Uuid> = cart::Entity::find()
            .filter(cart::Column::UserId.eq(user_id))
            .select_only()
            .column(cart::Column::Id)
            .into_tuple()
            .all(&txn)
            .await?;
        if !cart_ids.is_empty() {
            cart_item::Entity::delete_many()
                .filter(cart_item::Column::CartId.is_in(cart_ids))
                .exec(&txn)
                .await?;
        }
        cart::Entity::delete_many()
            .filter(cart::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;

        let wishlist_ids: Vec<Uuid> = wishlist::Entity::find()
            .filter(wishlist::Column::UserId.eq(user_id))
            .select_only()
            .column(wishlist::Column::Id)
            .into_tuple()
            .all(&txn)
            .await?;
        if !wishlist_ids.is_empty() {
            wishlist_item::Entity::delete_many()
                .filter(wishlist_item::Column::WishlistId.is_in(wishlist_ids))
                .exec(&txn)
                .await?;
        }
        wishlist::Entity::delete_many()
            .filter(wishlist::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;

        address::Entity::delete_many()
            .filter(address::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;

        let order_ids: Vec<Uuid> = order::Entity::find()
            .filter(order::Column::UserId.eq(user_id))
            .select_only()
            .column(order::Column::Id)
            .into_tuple()
            .all(&txn)
            .await?;
        if !order_ids.is_empty() {
            order_item::Entity::delete_many()
                .filter(order_item::Column::OrderId.is_in(order_ids))
                .exec(&txn)
                .await?;
        }
        order::Entity::delete_many()
            .filter(order::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;

        user_settings::Entity::delete_many()
            .filter(user_settings::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;

        user::Entity::delete_by_id(user_id).exec(&txn).await?;

        txn.commit().await?;

        info!(%user_id, "Account and owned data deleted");
        self.emit(Event::AccountDeleted { user_id }).await;

        Ok(())
    }
}
