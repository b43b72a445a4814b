// Application layer: the operations the CLI (or any other client) calls.
// Account checks that belong to the caller of a transfer (existence,
// currency) live here; the atomic transfer itself lives in storage.

pub mod error;
pub mod service;

pub use error::*;
pub use service::*;
