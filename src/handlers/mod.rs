pub mod health;
pub mod invoke;

pub use health::health_handler;
pub use invoke::invoke_handler;
