pub mod accounts;
pub mod addresses;
pub mod orders;
pub mod password_reset;

pub use accounts::AccountService;
pub use addresses::AddressService;
pub use orders::OrderHistoryService;
pub use password_reset::PasswordResetService;
