pub mod alert;
pub mod analytics;
pub mod asset;
pub mod config;
pub mod error;
pub mod reading;

pub use alert::*;
pub use analytics::*;
pub use asset::*;
pub use config::Config;
pub use error::*;
pub use reading::*;
