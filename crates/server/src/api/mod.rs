pub mod assets;
pub mod handlers;
pub mod middleware;
pub mod orchestrator;
pub mod routes;
pub mod stories;
pub mod ws;

pub use routes::create_router;
pub use ws::WsBroadcaster;
