pub mod server;

pub use server::{BridgeError, BridgeServer};
