#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use storefront_account_api::{
    api_v1_routes,
    auth::SessionService,
    config::AppConfig,
    db,
    entities::{address, cart, cart_item, order, order_item, product, user, wishlist, wishlist_item, OrderStatus},
    events::{self, EventSender},
    handlers::AppServices,
    mailer::NoopMailer,
    services::{AccountService, AddressService, OrderHistoryService, PasswordResetService},
    AppState,
};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

/// Harness that spins up the full application state against a throwaway
/// SQLite database and exposes the router for in-process requests.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    db_file: String,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let db_file = format!("storefront_test_{}.db", Uuid::new_v4().simple());
        let _ = std::fs::remove_file(&db_file);

        let mut cfg = AppConfig::new(
            format!("sqlite://{db_file}?mode=rwc"),
            "0f8a2c41d6b97e3a5c10f4e8d2b6a791c3e5f7a9b1d3c5e7f9a1b3c5d7e9f1a3".to_string(),
            "test".to_string(),
        );
        cfg.auto_migrate = true;
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");

        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx));

        let sessions = SessionService::from_config(&cfg);

        let services = AppServices {
            accounts: AccountService::new(db_arc.clone(), Some(event_sender.clone())),
            addresses: AddressService::new(db_arc.clone(), Some(event_sender.clone())),
            orders: OrderHistoryService::new(db_arc.clone()),
            password_resets: PasswordResetService::new(
                db_arc.clone(),
                Arc::new(NoopMailer),
                Some(event_sender.clone()),
                cfg.app_base_url.clone(),
                cfg.reset_token_ttl_secs,
            ),
        };

        let state = AppState {
            db: db_arc,
            config: Arc::new(cfg),
            event_sender,
            sessions,
            services,
        };

        let router = Router::new()
            .nest("/api/v1", api_v1_routes())
            .with_state(state.clone());

        Self {
            router,
            state,
            db_file,
            _event_task: event_task,
        }
    }

    /// Inserts a user with the given password (hashed at a low work factor
    /// for speed) and returns the row.
    pub async fn seed_user(&self, email: &str, password: &str) -> user::Model {
        let model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.to_string()),
            name: Set("Test User".to_string()),
            image: Set(None),
            password_hash: Set(bcrypt::hash(password, 4).expect("hash test password")),
            reset_token: Set(None),
            reset_token_expires_at: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };
        model.insert(&*self.state.db).await.expect("seed user")
    }

    /// Issues a session token for a seeded user.
    pub fn token_for(&self, user: &user::Model) -> String {
        self.state
            .sessions
            .issue_token(user.id, &user.email, Some(&user.name))
            .expect("issue test session token")
    }

    pub async fn seed_product(&self, name: &str) -> product::Model {
        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            image: Set(Some(format!("https://cdn.example.com/{name}.png"))),
        };
        model.insert(&*self.state.db).await.expect("seed product")
    }

    pub async fn seed_order(
        &self,
        user_id: Uuid,
        order_number: &str,
        created_at: DateTime<Utc>,
    ) -> order::Model {
        let model = order::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            order_number: Set(order_number.to_string()),
            status: Set(OrderStatus::Delivered),
            total: Set(Decimal::new(4999, 2)),
            shipping_street: Set("1 Main St".to_string()),
            shipping_city: Set("Springfield".to_string()),
            shipping_state: Set("IL".to_string()),
            shipping_country: Set("US".to_string()),
            shipping_zip_code: Set("62704".to_string()),
            created_at: Set(created_at),
        };
        model.insert(&*self.state.db).await.expect("seed order")
    }

    pub async fn seed_order_item(&self, order_id: Uuid, product_id: Uuid) -> order_item::Model {
        let model = order_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            product_id: Set(product_id),
            quantity: Set(2),
            unit_price: Set(Decimal::new(2499, 2)),
        };
        model.insert(&*self.state.db).await.expect("seed order item")
    }

    pub async fn seed_cart_with_item(&self, user_id: Uuid, product_id: Uuid) -> cart::Model {
        let cart_model = cart::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            created_at: Set(Utc::now()),
        };
        let cart_row = cart_model.insert(&*self.state.db).await.expect("seed cart");

        let item = cart_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            cart_id: Set(cart_row.id),
            product_id: Set(product_id),
            quantity: Set(1),
            unit_price: Set(Decimal::new(999, 2)),
        };
        item.insert(&*self.state.db).await.expect("seed cart item");

        cart_row
    }

    pub async fn seed_wishlist_with_item(&self, user_id: Uuid, product_id: Uuid) -> wishlist::Model {
        let wishlist_model = wishlist::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            created_at: Set(Utc::now()),
        };
        let wishlist_row = wishlist_model
            .insert(&*self.state.db)
            .await
            .expect("seed wishlist");

        let item = wishlist_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            wishlist_id: Set(wishlist_row.id),
            product_id: Set(product_id),
        };
        item.insert(&*self.state.db)
            .await
            .expect("seed wishlist item");

        wishlist_row
    }

    pub async fn seed_address(&self, user_id: Uuid, street: &str, is_default: bool) -> address::Model {
        let model = address::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            street: Set(street.to_string()),
            city: Set("Springfield".to_string()),
            state: Set("IL".to_string()),
            country: Set("US".to_string()),
            zip_code: Set("62704".to_string()),
            is_default: Set(is_default),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };
        model.insert(&*self.state.db).await.expect("seed address")
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {tok}"));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

/// Deserializes a response body as JSON.
pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("response body is not valid json")
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
        let _ = std::fs::remove_file(&self.db_file);
    }
}
