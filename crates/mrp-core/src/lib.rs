pub mod cancel;
pub mod error;
pub mod models;
pub mod repository;
pub mod serial;
pub mod validate;

pub use cancel::*;
pub use error::*;
pub use models::*;
pub use repository::*;
