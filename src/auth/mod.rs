pub mod guard;
pub mod session;
