// bazaar/src/services/mod.rs

//! Domain operations that run as a single step, plus the external
//! collaborators (payments, mail) and the crypto helpers.

pub mod accounts;
pub mod auth_service;
pub mod cart;
pub mod catalog;
pub mod mailer;
pub mod moderation;
pub mod order_lifecycle;
pub mod payment_gateway;
pub mod reporting;
pub mod session;
pub mod webhook_signature;
