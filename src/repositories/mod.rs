//! Typed query surfaces over the record store.

pub mod cart;
pub mod catalog;
pub mod order;
pub mod user;

pub use cart::CartRepository;
pub use catalog::{BannerRepository, CategoryRepository, ComboRepository, ProductRepository};
pub use order::OrderRepository;
pub use user::UserRepository;
