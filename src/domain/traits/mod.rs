//! Domain traits - Seams to the external protocol client

pub mod transport;
pub mod store;

pub use transport::{Connection, ConnectionHandle, ConnectOptions, Connector, SendReceipt};
pub use store::SessionStore;
