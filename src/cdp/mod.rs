//! Chrome DevTools Protocol plumbing: connection, flat sessions, wire types.

mod connection;
mod error;
mod page;
pub mod protocol;
mod session;

pub use connection::{CdpConnection, ConnectionConfig};
pub use error::CdpError;
pub use page::CdpPage;
pub use session::{CdpSession, ProtocolSession};
