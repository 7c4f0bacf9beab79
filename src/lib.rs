//! Minestars - player economy engine
//!
//! Rubies accrue while a player's torch is lit; stars come from a two-lane
//! mining game with weighted rewards and collectible drops. Every operation is
//! an isolated read-modify-write on one player record, evaluated lazily against
//! the clock at the moment of access.

pub mod api;
pub mod clock;
pub mod config;
pub mod economy;
pub mod errors;
pub mod leaderboard;
pub mod metrics;
pub mod mining;
pub mod player;
pub mod player_store;
pub mod shop;
pub mod storage;
pub mod torch;

pub use config::{ConfigLoader, MinestarsConfig};
pub use economy::Economy;
pub use errors::{EconomyError, MinestarsResult};
pub use player::{Player, PlayerId, PlayerView, Profile};
