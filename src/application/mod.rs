//! Application services layer scaffolding.

pub mod auth;
pub mod blog;
pub mod clients;
pub mod donations;
pub mod email_admin;
pub mod error;
pub mod forum;
pub mod newsletter;
pub mod password_reset;
pub mod product_votes;
pub mod reports;
pub mod repos;
pub mod signature;
pub mod stats;
pub mod subscriptions;
pub mod voting;
pub mod waitlist;
pub mod webhooks;
