pub mod cart;
pub mod common;
pub mod order;
pub mod otp;
pub mod plan;
pub mod user;
