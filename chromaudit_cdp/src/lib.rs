//! Hand-written CDP types for the domains the auditor subscribes to.
//!
//! Only the commands and events the auditor actually sends or consumes are
//! modeled; everything else in the protocol is ignored at the envelope level.

pub mod debugger;
pub mod network;
pub mod page;
pub mod runtime;
pub mod target;
