//! API handlers.

pub mod admin;
pub mod health;
pub mod payments;
pub mod plans;
pub mod subscriptions;
pub mod webhooks;
