pub mod biography;
pub mod blog;
pub mod event;
pub mod session;
pub mod user;
pub mod work;
