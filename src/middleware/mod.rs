pub mod identity;

pub use identity::{AdminId, UserId, ADMIN_ID_HEADER, USER_ID_HEADER};
