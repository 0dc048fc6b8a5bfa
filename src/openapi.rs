use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront Account API",
        version = "0.1.0",
        description = r#"
# Storefront Account API

User-account and order-management backend for an e-commerce storefront.

## Features

- **Password Reset**: Forgot-password and token-based reset flows
- **Profile Management**: Name, email, avatar, and password changes
- **Address Book**: Shipping-address CRUD with a single default per user
- **Order History**: Past orders with line items and shipping snapshots
- **Notification Settings**: Per-user email preference toggles
- **Account Deletion**: Password-confirmed deletion of the account and all owned data

## Authentication

Endpoints under `/user` require a session token minted by the storefront's
login service. Pass it as a bearer token or a `session` cookie:

```
Authorization: Bearer <session-token>
```

## Error Handling

Errors use a consistent body with appropriate HTTP status codes:

```json
{
  "error": "Not Found",
  "message": "Address not found",
  "request_id": "req-abc123xyz",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "auth", description = "Password reset flows"),
        (name = "account", description = "Profile, settings, and account deletion"),
        (name = "addresses", description = "Shipping-address book"),
        (name = "orders", description = "Order history")
    ),
    paths(
        crate::handlers::auth::forgot_password,
        crate::handlers::auth::reset_password,

        crate::handlers::account::get_profile,
        crate::handlers::account::update_profile,
        crate::handlers::account::get_settings,
        crate::handlers::account::update_settings,
        crate::handlers::account::delete_account,

        crate::handlers::addresses::list_addresses,
        crate::handlers::addresses::create_address,
        crate::handlers::addresses::update_address,
        crate::handlers::addresses::delete_address,
        crate::handlers::addresses::set_default_address,

        crate::handlers::orders::list_orders,
    ),
    components(
        schemas(
            crate::handlers::auth::ForgotPasswordRequest,
            crate::handlers::auth::ResetPasswordRequest,
            crate::handlers::account::UpdateProfileRequest,
            crate::handlers::account::UpdateSettingsRequest,
            crate::handlers::account::DeleteAccountRequest,
            crate::handlers::addresses::AddressRequest,

            crate::services::orders::OrderSummary,
            crate::services::orders::OrderLine,
            crate::services::orders::OrderLineProduct,
            crate::services::orders::ShippingSnapshot,
            crate::entities::OrderStatus,

            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
