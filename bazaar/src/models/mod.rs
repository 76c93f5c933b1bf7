// bazaar/src/models/mod.rs

//! Marketplace documents: users (with their cart), products (with reviews)
//! and orders.

pub mod cart;
pub mod order;
pub mod product;
pub mod user;
pub mod verification;

pub use cart::CartLine;
pub use order::{Order, OrderLine, OrderStatus, PaymentMethod, PaymentStatus, ShippingAddress};
pub use product::{Product, ProductDraft, Review, ReviewInput};
pub use user::{Role, ShopDetails, User};
pub use verification::{ModerationDecision, VerificationStatus};
