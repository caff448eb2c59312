//! Domain models for the stock lookup platform

mod article;
mod filters;
mod stock_level;
mod user;
mod warehouse;

pub use article::*;
pub use filters::*;
pub use stock_level::*;
pub use user::*;
pub use warehouse::*;
