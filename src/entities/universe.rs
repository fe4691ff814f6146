//! Universe-level entities: systems, bases and factions
//!
//! `universe.ini` declares every star system and every dockable base;
//! `initial_world.ini` declares the factions ("groups") and their pairwise
//! reputations; `faction_prop.ini` adds the behavioural properties of each
//! faction's NPCs. A `Base` here is the abstract market location - its
//! physical representation in space is a separate
//! [`Solar`](crate::entities::solars::Solar) that references it back by
//! nickname.

use std::sync::Arc;

use crate::entities::goods::MarketEntry;
use crate::entities::solars::Solar;
use crate::entities::{Entity, EntitySet};
use crate::formats::{Entry, Section, Value};
use crate::registry::{note_dangling, Freelancer};

/// A star system.
#[derive(Debug, Clone)]
pub struct System {
    pub nickname: String,
    pub ids_name: Option<u32>,
    pub ids_info: Option<u32>,
    /// Path of the system definition file, relative to the directory of
    /// `universe.ini`.
    pub file: String,
    /// Scale factor of the in-game navmap grid.
    pub navmapscale: f32,
    /// Position on the universe map, if declared.
    pub pos: Option<(f32, f32)>,
}

impl Entity for System {
    const KIND: &'static str = "system";

    fn nickname(&self) -> &str {
        &self.nickname
    }

    fn ids_name(&self) -> Option<u32> {
        self.ids_name
    }

    fn ids_info(&self) -> Option<u32> {
        self.ids_info
    }
}

impl System {
    pub(crate) fn from_section(section: &Section) -> Option<Self> {
        Some(System {
            nickname: section.string("nickname")?.to_ascii_lowercase(),
            ids_name: section
                .resource_id("strid_name")
                .or_else(|| section.resource_id("ids_name")),
            ids_info: section.resource_id("ids_info"),
            file: section.string("file")?.to_string(),
            navmapscale: section.float("navmapscale").unwrap_or(1.0),
            pos: section.get("pos").and_then(|e| match e.values.as_slice() {
                [x, y, ..] => Some((x.as_f32()?, y.as_f32()?)),
                _ => None,
            }),
        })
    }

    /// Everything fixed in space in this system.
    pub fn contents(&self, fl: &Freelancer) -> Arc<EntitySet<Solar>> {
        fl.system_contents(self)
    }

    /// All solid objects in this system.
    pub fn objects(&self, fl: &Freelancer) -> EntitySet<Solar> {
        self.contents(fl).filter(|s| s.as_object().is_some())
    }

    /// All zones in this system.
    pub fn zones(&self, fl: &Freelancer) -> EntitySet<Solar> {
        self.contents(fl).filter(|s| s.as_zone().is_some())
    }

    /// All base solars in this system, planetary bases included.
    pub fn bases(&self, fl: &Freelancer) -> EntitySet<Solar> {
        self.contents(fl).filter(|s| s.as_base().is_some())
    }

    /// All planets in this system, planetary bases included.
    pub fn planets(&self, fl: &Freelancer) -> EntitySet<Solar> {
        self.contents(fl).filter(|s| s.as_planet().is_some())
    }

    /// All stars in this system.
    pub fn stars(&self, fl: &Freelancer) -> EntitySet<Solar> {
        self.contents(fl).filter(|s| s.as_star().is_some())
    }

    /// All jump conduits leading out of this system.
    pub fn jumps(&self, fl: &Freelancer) -> EntitySet<Solar> {
        self.contents(fl).filter(|s| s.as_jump().is_some())
    }

    /// All trade lane rings in this system.
    pub fn trade_lane_rings(&self, fl: &Freelancer) -> EntitySet<Solar> {
        self.contents(fl).filter(|s| s.as_ring().is_some())
    }

    /// The trade lanes of this system, each a chain of rings in order.
    pub fn lanes(&self, fl: &Freelancer) -> Vec<Vec<Solar>> {
        fl.system_lanes(self)
    }

    /// The connections this system has to other systems: each jump
    /// conduit with its destination, when the destination resolves.
    pub fn connections<'a>(&self, fl: &'a Freelancer) -> Vec<(Solar, Option<&'a System>)> {
        self.jumps(fl)
            .into_iter()
            .map(|jump| {
                let destination = fl.jump_destination(&jump);
                (jump, destination)
            })
            .collect()
    }
}

/// A space station or colonised planet, as a market location.
#[derive(Debug, Clone)]
pub struct Base {
    pub nickname: String,
    pub ids_name: Option<u32>,
    /// Nickname of the system this base resides in.
    pub system: String,
}

impl Entity for Base {
    const KIND: &'static str = "base";

    fn nickname(&self) -> &str {
        &self.nickname
    }

    fn ids_name(&self) -> Option<u32> {
        self.ids_name
    }
}

impl Base {
    pub(crate) fn from_section(section: &Section) -> Option<Self> {
        Some(Base {
            nickname: section.string("nickname")?.to_ascii_lowercase(),
            ids_name: section
                .resource_id("strid_name")
                .or_else(|| section.resource_id("ids_name")),
            system: section.string("system")?.to_ascii_lowercase(),
        })
    }

    /// The system this base resides in, when the reference resolves.
    pub fn system_entity<'a>(&self, fl: &'a Freelancer) -> Option<&'a System> {
        let system = fl.systems().get(&self.system);
        if system.is_none() {
            note_dangling(&self.nickname, &self.system);
        }
        system
    }

    /// The solar physically representing this base. Freelancer defines
    /// bases separately from their in-space representation; the solar
    /// references the base back by nickname.
    pub fn solar(&self, fl: &Freelancer) -> Option<Solar> {
        let system = self.system_entity(fl)?;
        fl.system_contents(system)
            .iter()
            .find(|s| {
                s.as_base()
                    .is_some_and(|b| b.base.eq_ignore_ascii_case(&self.nickname))
            })
            .cloned()
    }

    pub fn has_solar(&self, fl: &Freelancer) -> bool {
        self.solar(fl).is_some()
    }

    /// This base's market: the goods it sells and buys, with prices.
    pub fn market(&self, fl: &Freelancer) -> MarketEntry {
        fl.market_of(&self.nickname)
    }
}

/// A faction (the files say "group"): any organisation a player or NPC can
/// hold a reputation with.
#[derive(Debug, Clone)]
pub struct Faction {
    pub nickname: String,
    pub ids_name: Option<u32>,
    pub ids_info: Option<u32>,
    /// Pairwise reputation, `(-1.0 reviled ..= 1.0 adored, faction)`.
    pub rep: Vec<(f32, String)>,
    /// NPC behaviour properties from `faction_prop.ini`, when declared.
    pub props: Option<FactionProps>,
}

/// The `[FactionProps]` attributes that govern a faction's NPCs in space.
#[derive(Debug, Clone)]
pub struct FactionProps {
    pub legality: String,
    pub jump_preference: Option<String>,
    pub npc_ships: Vec<String>,
    pub scan_for_cargo: Vec<String>,
}

impl Entity for Faction {
    const KIND: &'static str = "faction";

    fn nickname(&self) -> &str {
        &self.nickname
    }

    fn ids_name(&self) -> Option<u32> {
        self.ids_name
    }

    fn ids_info(&self) -> Option<u32> {
        self.ids_info
    }
}

impl Faction {
    pub(crate) fn from_section(section: &Section) -> Option<Self> {
        let rep = section
            .get_all("rep")
            .filter_map(|entry| match entry.values.as_slice() {
                [weight, Value::Str(faction), ..] => {
                    Some((weight.as_f32()?, faction.to_ascii_lowercase()))
                }
                _ => None,
            })
            .collect();
        Some(Faction {
            nickname: section.string("nickname")?.to_ascii_lowercase(),
            ids_name: section.resource_id("ids_name"),
            ids_info: section.resource_id("ids_info"),
            rep,
            props: None,
        })
    }

    pub(crate) fn attach_props(&mut self, section: &Section) {
        self.props = Some(FactionProps {
            legality: section.string("legality").unwrap_or("lawful").to_string(),
            jump_preference: section.string("jump_preference").map(str::to_string),
            npc_ships: section
                .get_all("npc_ship")
                .filter_map(Entry::as_str)
                .map(str::to_string)
                .collect(),
            scan_for_cargo: section
                .get_all("scan_for_cargo")
                .filter_map(Entry::as_str)
                .map(str::to_string)
                .collect(),
        });
    }

    /// How this faction views the others: nickname to reputation weight.
    pub fn rep_with(&self, faction: &str) -> Option<f32> {
        self.rep
            .iter()
            .find(|(_, f)| f.eq_ignore_ascii_case(faction))
            .map(|&(weight, _)| weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::ini;

    #[test]
    fn test_system_defaults() {
        let sections = ini::parse(
            b"[system]\nnickname = Li01\nfile = systems\\li01\\li01.ini\nstrid_name = 196609\n",
            "universe.ini",
        );
        let system = System::from_section(&sections[0]).unwrap();
        assert_eq!(system.nickname, "li01");
        assert_eq!(system.ids_name, Some(196609));
        assert_eq!(system.navmapscale, 1.0);
        assert!(system.pos.is_none());
    }

    #[test]
    fn test_system_requires_file() {
        let sections = ini::parse(b"[system]\nnickname = bogus\n", "universe.ini");
        assert!(System::from_section(&sections[0]).is_none());
    }

    #[test]
    fn test_faction_rep_sheet() {
        let sections = ini::parse(
            b"[Group]\nnickname = li_n_grp\nids_name = 196846\nrep = 0.65, li_lsf_grp\nrep = -0.65, fc_x_grp\n",
            "initial_world.ini",
        );
        let faction = Faction::from_section(&sections[0]).unwrap();
        assert_eq!(faction.rep_with("li_lsf_grp"), Some(0.65));
        assert_eq!(faction.rep_with("fc_x_grp"), Some(-0.65));
        assert_eq!(faction.rep_with("unknown"), None);
    }
}
