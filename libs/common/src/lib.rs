pub mod id;
pub mod role;
pub mod time;

pub use id::UserId;
pub use role::Role;
