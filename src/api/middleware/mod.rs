pub mod auth;
pub mod logging;

pub use auth::{require_caller, CallerId, USER_ID_HEADER};
pub use logging::request_logger;
