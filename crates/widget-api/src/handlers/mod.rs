pub mod health;
pub mod public;
pub mod stats;
pub mod submissions;
pub mod ttl;
pub mod utils;
pub mod widgets;

pub use health::health;
pub use utils::{metrics, not_found};
