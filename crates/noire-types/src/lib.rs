pub mod error;
pub mod config;
pub mod role;
pub mod lifecycle;

// Domain modules
pub mod models;
pub mod case;
pub mod evidence;
pub mod investigation;
pub mod trial;

pub use error::*;
pub use config::*;
pub use role::*;
pub use lifecycle::*;

pub use models::*;
pub use case::*;
pub use evidence::*;
pub use investigation::*;
pub use trial::*;
