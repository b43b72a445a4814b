pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod io;
pub mod logging;
pub mod storage;
pub mod util;

pub use config::StoreConfig;
pub use domain::*;
pub use storage::{Store, StoreError, TransferTxParams, TransferTxResult};
