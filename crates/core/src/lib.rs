pub mod analysis;
pub mod config;
pub mod error;
pub mod observation;

pub use analysis::*;
pub use config::Config;
pub use error::*;
pub use observation::*;
