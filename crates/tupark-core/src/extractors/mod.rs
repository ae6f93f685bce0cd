pub mod admin_user;
pub mod client_addr;
pub mod json;

pub use admin_user::AdminUser;
pub use client_addr::ClientAddr;
pub use json::Json;
