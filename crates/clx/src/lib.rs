//! clx - command launcher
//!
//! Library side of the launcher binary. Currently hosts the self-update
//! subsystem; the launcher itself is a thin wrapper in `main.rs`.

pub mod updater;
