pub mod auth;
pub mod cart;
pub mod health;
pub mod payment;
pub mod plan;
