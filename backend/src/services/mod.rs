//! Business logic services for the Distribution Order Management backend

pub mod auth;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod reporting;
pub mod stock;
pub mod users;

pub use auth::AuthService;
pub use notifications::Notifier;
pub use orders::OrderService;
pub use products::ProductService;
pub use reporting::ReportingService;
pub use stock::StockService;
pub use users::UserService;
