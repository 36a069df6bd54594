pub mod server;
pub mod transport;
pub mod types;
