//! chromaudit attaches to a running Chromium-family browser over the Chrome
//! DevTools Protocol and reconstructs a provenance graph of the browsing
//! session: frames, the scripts that ran in them, the requests they made and
//! the hosts that answered. The graph is emitted as append-only
//! semicolon-delimited relation files, one per node or edge label, ready for
//! bulk-loading into a graph database.
//!
//! The auditor never drives the browser; it only listens.

pub use chromaudit_cdp as cdp;
pub use chromaudit_types as types;

pub mod browser;
pub mod conn;
pub mod context;
pub mod error;
pub mod graph;
pub mod handler;
pub mod writer;

pub use browser::BrowserConfig;
pub use context::AuditContext;
pub use error::AuditError;
pub use handler::Handler;
