//! Airside Forms HTTP API
//! REST API untuk form builder, pengisian form teknisi, dan analitik

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod types;

pub use handlers::AppState;
pub use middleware::{start_cleanup_task, RateLimiter, Session};
pub use routes::create_router;
pub use types::*;
