//! Infrastructure layer for aircon-ctl.
//!
//! Contains OS-facing adapters: UDP sockets for the device protocol and
//! file-system storage for the configuration.
//!
//! **Dependency rule**: this layer depends only on `aircon_core`; the
//! `application` layer builds on top of it.

pub mod network;
pub mod storage;
