//! # fldata
//!
//! A Rust library for reading the data files of Freelancer (2003).
//!
//! ## Overview
//!
//! Freelancer defines its entire world - star systems, bases, factions,
//! ships, commodities, trade lanes - in a tree of INI-style configuration
//! files that cross-reference each other by string nicknames. This library
//! provides:
//!
//! - Decoders for the game's binary containers: BINI (compressed INI),
//!   PE resource DLLs (strings and rich-text infocards) and UTF trees
//!   (icons and other binary assets)
//! - A parser for the game's lenient textual INI dialect, unified with the
//!   BINI decoder behind a single section stream
//! - A typed, lazily built entity graph over an install directory, with
//!   nickname-indexed collections and resolved display strings
//!
//! Everything is read-only: no format is written, no file is modified.
//!
//! ## Example
//!
//! ```rust,no_run
//! use fldata::{Freelancer, Markup};
//!
//! fn main() -> fldata::Result<()> {
//!     let fl = Freelancer::open("C:/Games/Freelancer")?;
//!
//!     for base in fl.bases() {
//!         println!("{}", fl.name_of(base));
//!     }
//!
//!     let system = fl.systems().get("li01").expect("vanilla install");
//!     for planet in system.planets(&fl).iter() {
//!         println!("{}", fl.infocard_of(planet, Markup::Plain));
//!     }
//!     Ok(())
//! }
//! ```

pub mod entities;
pub mod error;
pub mod formats;
pub mod paths;
pub mod rdl;
pub mod registry;

pub use entities::goods::{Commodity, Equipment, Good, MarketEntry, Ship};
pub use entities::solars::{
    BaseSolar, Jump, JumpKind, ObjectClass, Planet, Solar, SolarKind, Star, TradeLaneRing, Wreck,
    Zone,
};
pub use entities::universe::{Base, Faction, FactionProps, System};
pub use entities::{Entity, EntitySet};
pub use error::{BinaryFormat, BinaryReason, Error, Result};
pub use formats::{Entry, Section, Value};
pub use rdl::Markup;
pub use registry::{installation, set_install_path, Freelancer};
