pub mod deadline;
pub mod error;
pub mod money;
pub mod timezone;

pub use error::{AppError, Result};
pub use timezone::TimezoneConverter;
