pub mod channels;
pub mod control;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod middleware;
pub mod records;
pub mod routes;
pub mod search;

pub use error::{ApiError, ErrorResponse};
pub use routes::create_router;
