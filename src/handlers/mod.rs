pub mod account;
pub mod addresses;
pub mod auth;
pub mod common;
pub mod orders;

use crate::services::{AccountService, AddressService, OrderHistoryService, PasswordResetService};

/// The service layer, bundled for [`crate::AppState`].
#[derive(Clone)]
pub struct AppServices {
    pub accounts: AccountService,
    pub addresses: AddressService,
    pub orders: OrderHistoryService,
    pub password_resets: PasswordResetService,
}
