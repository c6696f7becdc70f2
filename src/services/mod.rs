pub mod activity;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod dashboard;
pub mod orders;
pub mod roles;
pub mod wishlist;
