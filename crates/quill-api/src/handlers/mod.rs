//! API handlers

pub mod health;
pub mod images;
pub mod posts;
pub mod users;
