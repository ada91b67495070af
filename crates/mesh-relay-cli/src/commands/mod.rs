//! CLI command implementations.
//!
//! - [`simulate`] - In-memory flood simulation
//! - [`codec`] - Wire payload encode/decode
//! - [`config`] - Default configuration output

pub mod codec;
pub mod config;
pub mod simulate;

pub use codec::{decode, encode};
pub use config::init_config;
pub use simulate::simulate;
