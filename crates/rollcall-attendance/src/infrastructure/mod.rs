//! Infrastructure layer for the attendance server.
//!
//! Contains the OS-facing adapters: the TCP listener and per-connection
//! session handler, the identity-service committer, and the TOML
//! configuration file.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `rollcall_core`, but MUST NOT be imported by the `application` layer.

pub mod network;
pub mod storage;
