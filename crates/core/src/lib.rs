//! Pack opening engine. Keep this crate free of IO and platform concerns.

pub mod cards;
pub mod config;
pub mod content;
pub mod draw;
pub mod events;
pub mod game;
pub mod ledger;
pub mod persistence;
pub mod rng;
pub mod session;

pub use cards::*;
pub use config::*;
pub use content::*;
pub use draw::*;
pub use events::*;
pub use game::*;
pub use ledger::*;
pub use persistence::*;
pub use rng::*;
pub use session::*;
