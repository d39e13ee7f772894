pub mod http_api;
pub mod server;
