mod actor;
pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod location;
pub mod route;
pub mod session;
pub mod store;
mod tracker;

pub use clock::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use location::*;
pub use route::*;
pub use session::*;
pub use store::*;
pub use tracker::*;
