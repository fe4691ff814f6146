//! Solars: everything fixed in space inside a system
//!
//! A system definition file is a run of `[Object]` and `[Zone]` sections.
//! "Solar" is the game's own word for them (after the `DATA/SOLAR`
//! directory). Objects are solid bodies - stations, planets, stars, jump
//! gates, trade lane rings, wrecks; zones are regions of space with
//! effects attached.
//!
//! The class hierarchy of the original game is re-expressed here as one
//! concrete [`Solar`] record plus capability sub-records: a landable
//! planet carries both a [`BaseSolar`] and a [`Planet`] record and shows
//! up in both the base and planet views of a system. Classification is
//! driven by which keys a section carries, with a small archetype table
//! as fallback; anything unrecognised stays a generic object rather than
//! failing.

use std::collections::HashMap;

use tracing::warn;

use crate::entities::universe::{Base, Faction, System};
use crate::entities::{Entity, EntitySet};
use crate::formats::Section;
use crate::registry::{note_dangling, Freelancer};

/// Something fixed in space, owned by a system.
#[derive(Debug, Clone)]
pub struct Solar {
    pub nickname: String,
    pub ids_name: Option<u32>,
    pub ids_info: Option<u32>,
    pub pos: (f32, f32, f32),
    pub rotate: (f32, f32, f32),
    /// Solar archetype string, as declared.
    pub archetype: Option<String>,
    /// Nickname of the owning system. Solars are built per system, so
    /// this back-reference never dangles.
    pub system: String,
    pub kind: SolarKind,
}

#[derive(Debug, Clone)]
pub enum SolarKind {
    Object(ObjectClass),
    Zone(Zone),
}

/// What kind of solid object this is, with the class-specific record.
#[derive(Debug, Clone)]
pub enum ObjectClass {
    Generic,
    Base(BaseSolar),
    /// A base on the surface of a planet: both capabilities at once.
    PlanetaryBase { base: BaseSolar, planet: Planet },
    Jump(Jump),
    TradeLaneRing(TradeLaneRing),
    Star(Star),
    Planet(Planet),
    Wreck(Wreck),
}

/// The physical representation of a [`Base`](crate::entities::universe::Base).
#[derive(Debug, Clone)]
pub struct BaseSolar {
    /// Nickname of the universe base this solar represents.
    pub base: String,
    /// Nickname of the faction operating this base.
    pub reputation: String,
}

/// A jump conduit - a wormhole, artificial or natural, to another system.
#[derive(Debug, Clone)]
pub struct Jump {
    /// Destination system nickname.
    pub to_system: String,
    /// Destination object nickname within that system.
    pub to_object: String,
}

/// How a jump conduit presents in game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpKind {
    Gate,
    Hole,
    AtmosphericEntry,
    Unknown,
}

/// One ring of a trade lane. Rings chain into lanes through their
/// `prev_ring`/`next_ring` nicknames.
#[derive(Debug, Clone, Default)]
pub struct TradeLaneRing {
    pub prev_ring: Option<String>,
    pub next_ring: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Star {
    /// Star archetype from `stararch.ini`, when declared.
    pub star: Option<String>,
    pub atmosphere_range: f32,
}

#[derive(Debug, Clone, Default)]
pub struct Planet {
    pub spin: (f32, f32, f32),
    pub atmosphere_range: f32,
}

/// A lootable wrecked ship ("secrets" in the files).
#[derive(Debug, Clone)]
pub struct Wreck {
    /// Loadout dropped when the wreck is shot open.
    pub loadout: String,
}

/// A region of space, possibly with effects attached.
#[derive(Debug, Clone)]
pub struct Zone {
    /// One of `sphere`, `ring`, `box`, `ellipsoid`, `cylinder`.
    pub shape: Option<String>,
    /// One to three extents, depending on the shape.
    pub size: Vec<f32>,
}

impl Entity for Solar {
    const KIND: &'static str = "solar";

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

impl Solar {
    pub fn as_object(&self) -> Option<&ObjectClass> {
        match &self.kind {
            SolarKind::Object(class) => Some(class),
            SolarKind::Zone(_) => None,
        }
    }

    pub fn as_zone(&self) -> Option<&Zone> {
        match &self.kind {
            SolarKind::Zone(zone) => Some(zone),
            SolarKind::Object(_) => None,
        }
    }

    /// The base capability: present for plain base solars and planetary
    /// bases alike.
    pub fn as_base(&self) -> Option<&BaseSolar> {
        match self.as_object()? {
            ObjectClass::Base(base) | ObjectClass::PlanetaryBase { base, .. } => Some(base),
            _ => None,
        }
    }

    /// The planet capability: present for planets and planetary bases.
    pub fn as_planet(&self) -> Option<&Planet> {
        match self.as_object()? {
            ObjectClass::Planet(planet) | ObjectClass::PlanetaryBase { planet, .. } => Some(planet),
            _ => None,
        }
    }

    pub fn as_star(&self) -> Option<&Star> {
        match self.as_object()? {
            ObjectClass::Star(star) => Some(star),
            _ => None,
        }
    }

    pub fn as_jump(&self) -> Option<&Jump> {
        match self.as_object()? {
            ObjectClass::Jump(jump) => Some(jump),
            _ => None,
        }
    }

    pub fn as_ring(&self) -> Option<&TradeLaneRing> {
        match self.as_object()? {
            ObjectClass::TradeLaneRing(ring) => Some(ring),
            _ => None,
        }
    }

    pub fn as_wreck(&self) -> Option<&Wreck> {
        match self.as_object()? {
            ObjectClass::Wreck(wreck) => Some(wreck),
            _ => None,
        }
    }

    pub fn is_planetary_base(&self) -> bool {
        matches!(
            self.as_object(),
            Some(ObjectClass::PlanetaryBase { .. })
        )
    }

    /// Human-readable classification of a jump conduit, derived from its
    /// archetype string.
    pub fn jump_kind(&self) -> Option<JumpKind> {
        self.as_jump()?;
        let archetype = self.archetype.as_deref().unwrap_or("");
        Some(if archetype.contains("jumphole") {
            JumpKind::Hole
        } else if archetype.contains("gate") {
            JumpKind::Gate
        } else if archetype == "entrypoint" {
            JumpKind::AtmosphericEntry
        } else {
            JumpKind::Unknown
        })
    }

    /// The system this solar resides in.
    pub fn system_entity<'a>(&self, fl: &'a Freelancer) -> Option<&'a System> {
        fl.systems().get(&self.system)
    }

    /// The faction operating this base solar, when it resolves.
    pub fn owner<'a>(&self, fl: &'a Freelancer) -> Option<&'a Faction> {
        let reputation = &self.as_base()?.reputation;
        let faction = fl.factions().get(reputation);
        if faction.is_none() {
            note_dangling(&self.nickname, reputation);
        }
        faction
    }

    /// The universe [`Base`] this base solar represents, when it resolves.
    pub fn universe_base<'a>(&self, fl: &'a Freelancer) -> Option<&'a Base> {
        let nickname = &self.as_base()?.base;
        let base = fl.bases().get(nickname);
        if base.is_none() {
            note_dangling(&self.nickname, nickname);
        }
        base
    }

    /// Build a solar from an `[Object]` section. Unnamed scenery (objects
    /// without `ids_name` - docking fixtures, satellites and the like) is
    /// not represented and yields `None`, as does a section without a
    /// nickname.
    pub(crate) fn from_object_section(section: &Section, system: &str) -> Option<Self> {
        let nickname = section.string("nickname")?.to_ascii_lowercase();
        let ids_name = section.resource_id("ids_name")?;
        let archetype = section.string("archetype").map(str::to_ascii_lowercase);
        let kind = SolarKind::Object(classify(section, &nickname, archetype.as_deref()));

        Some(Solar {
            nickname,
            ids_name: Some(ids_name),
            ids_info: section.resource_id("ids_info"),
            pos: section.vec3("pos").unwrap_or_default(),
            rotate: section.vec3("rotate").unwrap_or_default(),
            archetype,
            system: system.to_string(),
            kind,
        })
    }

    /// Build a solar from a `[Zone]` section.
    pub(crate) fn from_zone_section(section: &Section, system: &str) -> Option<Self> {
        let size = section
            .get("size")
            .map(|entry| entry.values.iter().filter_map(|v| v.as_f32()).collect())
            .unwrap_or_default();
        Some(Solar {
            nickname: section.string("nickname")?.to_ascii_lowercase(),
            ids_name: section.resource_id("ids_name"),
            ids_info: section.resource_id("ids_info"),
            pos: section.vec3("pos").unwrap_or_default(),
            rotate: section.vec3("rotate").unwrap_or_default(),
            archetype: None,
            system: system.to_string(),
            kind: SolarKind::Zone(Zone {
                shape: section.string("shape").map(str::to_ascii_lowercase),
                size,
            }),
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum ArchetypeClass {
    Planet,
    Star,
    TradeLaneRing,
}

/// Fallback archetype classification, consulted when no key rule applies.
/// This mapping is data; extend it rather than the rules below when a mod
/// introduces new archetypes.
const ARCHETYPE_CLASSES: &[(&str, ArchetypeClass)] = &[
    ("planet", ArchetypeClass::Planet),
    ("sun", ArchetypeClass::Star),
    ("tradelane_ring", ArchetypeClass::TradeLaneRing),
];

/// Choose the concrete class of an object section.
///
/// Key presence decides first, because the keys carry the class payload:
/// `goto` makes a jump, ring links make a trade lane ring, `star` a star,
/// `spin` a planet (promoted to a planetary base when a `base` reference
/// is also present), `base` + `reputation` a base solar, `loadout` without
/// a faction a wreck. The archetype table above catches the rest.
fn classify(section: &Section, nickname: &str, archetype: Option<&str>) -> ObjectClass {
    let atmosphere_range = section.float("atmosphere_range").unwrap_or(0.0);

    if let Some(goto) = section.get("goto") {
        // `goto = <system>, <object>[, <tunnel effect>]`
        let mut tokens = goto.values.iter().filter_map(|v| v.as_str());
        match (tokens.next(), tokens.next()) {
            (Some(system), Some(object)) => {
                return ObjectClass::Jump(Jump {
                    to_system: system.to_ascii_lowercase(),
                    to_object: object.to_ascii_lowercase(),
                });
            }
            _ => warn!(nickname, "jump with malformed goto entry"),
        }
    }
    if section.has("prev_ring") || section.has("next_ring") {
        return ObjectClass::TradeLaneRing(TradeLaneRing {
            prev_ring: section.string("prev_ring").map(str::to_ascii_lowercase),
            next_ring: section.string("next_ring").map(str::to_ascii_lowercase),
        });
    }
    if let Some(star) = section.string("star") {
        return ObjectClass::Star(Star {
            star: Some(star.to_ascii_lowercase()),
            atmosphere_range,
        });
    }
    if let Some(spin) = section.vec3("spin") {
        let planet = Planet {
            spin,
            atmosphere_range,
        };
        return match base_record(section) {
            Some(base) => ObjectClass::PlanetaryBase { base, planet },
            None => ObjectClass::Planet(planet),
        };
    }
    if let Some(base) = base_record(section) {
        return ObjectClass::Base(base);
    }
    if let Some(loadout) = section.string("loadout") {
        // a loadout alongside a faction is a defended installation, not
        // lootable debris
        if !section.has("reputation") {
            return ObjectClass::Wreck(Wreck {
                loadout: loadout.to_ascii_lowercase(),
            });
        }
    }

    let fallback = archetype.and_then(|a| {
        ARCHETYPE_CLASSES
            .iter()
            .find(|(name, _)| *name == a)
            .map(|&(_, class)| class)
    });
    match fallback {
        Some(ArchetypeClass::Planet) => ObjectClass::Planet(Planet::default()),
        Some(ArchetypeClass::Star) => ObjectClass::Star(Star {
            star: None,
            atmosphere_range,
        }),
        Some(ArchetypeClass::TradeLaneRing) => {
            ObjectClass::TradeLaneRing(TradeLaneRing::default())
        }
        None => ObjectClass::Generic,
    }
}

fn base_record(section: &Section) -> Option<BaseSolar> {
    Some(BaseSolar {
        base: section.string("base")?.to_ascii_lowercase(),
        reputation: section.string("reputation")?.to_ascii_lowercase(),
    })
}

/// Reconstruct the trade lanes of one system: every maximal
/// `prev_ring`/`next_ring` chain, each ring appearing in exactly one lane.
/// Rings left over after walking every chain head (a broken `prev_ring`
/// or a cycle) start lanes of their own, with a diagnostic.
pub fn reconstruct_lanes(contents: &EntitySet<Solar>) -> Vec<Vec<Solar>> {
    let rings: Vec<&Solar> = contents.iter().filter(|s| s.as_ring().is_some()).collect();
    let by_nickname: HashMap<&str, usize> = rings
        .iter()
        .enumerate()
        .map(|(i, s)| (s.nickname.as_str(), i))
        .collect();

    let mut visited = vec![false; rings.len()];
    let mut lanes = Vec::new();

    let heads: Vec<usize> = (0..rings.len())
        .filter(|&i| rings[i].as_ring().is_some_and(|r| r.prev_ring.is_none()))
        .collect();
    let leftovers: Vec<usize> = (0..rings.len()).collect();

    for start in heads.into_iter().chain(leftovers) {
        if visited[start] {
            continue;
        }
        if rings[start].as_ring().is_some_and(|r| r.prev_ring.is_some()) {
            warn!(
                ring = rings[start].nickname.as_str(),
                "trade lane ring unreachable from any lane head"
            );
        }
        let mut lane = Vec::new();
        let mut current = Some(start);
        while let Some(at) = current {
            if visited[at] {
                warn!(
                    ring = rings[at].nickname.as_str(),
                    "cycle in trade lane chain"
                );
                break;
            }
            visited[at] = true;
            lane.push(rings[at].clone());
            current = match rings[at].as_ring().and_then(|r| r.next_ring.as_deref()) {
                Some(next) => match by_nickname.get(next) {
                    Some(&i) => Some(i),
                    None => {
                        warn!(
                            ring = rings[at].nickname.as_str(),
                            next, "next_ring does not name a ring in this system"
                        );
                        None
                    }
                },
                None => None,
            };
        }
        lanes.push(lane);
    }
    lanes
}
