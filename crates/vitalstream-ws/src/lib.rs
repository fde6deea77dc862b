pub mod device;
pub mod monitor;
pub mod server;

pub use server::{build_router, run_ws_server, GatewayState, WsServerConfig};
