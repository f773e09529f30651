//! Catalog storage layer
//!
//! Provides the single-operation SQL transport abstraction, the direct and
//! mediated (tool-server) transports, and the typed catalog store built on
//! top of them.

pub mod store;
pub mod tool_server;
pub mod transport;

pub use store::{display_filter_sql, CatalogStore};
pub use tool_server::{MediatedTransport, QueryToolServer};
pub use transport::{DirectTransport, Row, SqlTransport};
