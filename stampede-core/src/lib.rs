mod config;
mod constants;
mod endpoint;
mod error;
mod rpc;
mod stats;
mod threshold;

pub use config::*;
pub use constants::*;
pub use endpoint::*;
pub use error::*;
pub use rpc::*;
pub use stats::*;
pub use threshold::*;
