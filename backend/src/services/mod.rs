//! Business logic services for the stock lookup server

pub mod auth;
pub mod login_throttle;
pub mod stock;

pub use auth::AuthService;
pub use login_throttle::LoginThrottle;
pub use stock::{StockError, StockService, WarehouseStockPage};
