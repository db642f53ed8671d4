//! Infrastructure layer for the client tool.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `rollcall_core`, but MUST NOT be imported by the `application` layer.
//!
//! - **`network`** – One-request-per-connection TCP clients for the
//!   attendance server and the identity server.

pub mod network;
