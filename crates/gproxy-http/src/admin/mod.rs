pub mod auth;
pub mod routes;
pub mod ws;

pub use routes::admin_router;
