pub mod activity;
pub mod cart;
pub mod category;
pub mod dashboard;
pub mod order;
pub mod product;
pub mod role;
pub mod user;
pub mod wishlist;
