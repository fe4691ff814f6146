//! The registry: lazy, cached views over one Freelancer install
//!
//! [`Freelancer`] owns an install root and materialises each entity
//! collection the first time it is asked for. Construction of a
//! collection happens behind a one-shot initializer; once built, the set
//! is frozen and shared freely by readers. There is no partial update: a
//! different install root means a different `Freelancer` value (or a call
//! to [`set_install_path`], which swaps the whole process-wide default).
//!
//! Cross-file references are resolved here, lazily, and leniently: a
//! nickname that resolves to nothing is logged and read as an absence,
//! because broken mods are a fact of life and the game itself shrugs most
//! of this off.
//!
//! ## Example
//!
//! ```rust,no_run
//! use fldata::Freelancer;
//!
//! fn main() -> fldata::Result<()> {
//!     let fl = Freelancer::open("C:/Games/Freelancer")?;
//!     for system in fl.systems() {
//!         println!("{}", fl.name_of(system));
//!     }
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use once_cell::sync::{Lazy, OnceCell};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::entities::goods::{
    Commodity, Equipment, Good, MarketEntry, MarketGood, Ship, EQUIPMENT_KINDS,
};
use crate::entities::solars::{self, Solar};
use crate::entities::universe::{Base, Faction, System};
use crate::entities::{Entity, EntitySet};
use crate::error::{Error, Result};
use crate::formats::{self, dll, utf::UtfFile, Section};
use crate::paths::{resolve_case, InstallDir};
use crate::rdl::{self, Markup};

/// External ids advance by this much per resource DLL slot.
const IDS_PER_DLL: u32 = 65536;

/// One parsed, lazily materialised Freelancer installation.
pub struct Freelancer {
    install: InstallDir,
    systems: OnceCell<EntitySet<System>>,
    bases: OnceCell<EntitySet<Base>>,
    factions: OnceCell<EntitySet<Faction>>,
    goods: OnceCell<EntitySet<Good>>,
    goods_folded: OnceCell<HashMap<String, Good>>,
    markets: OnceCell<HashMap<String, MarketEntry>>,
    commodities: OnceCell<EntitySet<Commodity>>,
    ships: OnceCell<EntitySet<Ship>>,
    equipment: OnceCell<EntitySet<Equipment>>,
    contents: RwLock<HashMap<String, Arc<EntitySet<Solar>>>>,
    resources: OnceCell<Resources>,
}

/// The merged string/infocard tables of every declared resource DLL.
#[derive(Default)]
struct Resources {
    strings: HashMap<u32, String>,
    infocards: HashMap<u32, String>,
}

impl Freelancer {
    /// Open an install root. Fails only when the root or its inventory
    /// file (`EXE/freelancer.ini`) is missing; everything further in is
    /// read lazily and leniently.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        Ok(Freelancer {
            install: InstallDir::discover(root.as_ref())?,
            systems: OnceCell::new(),
            bases: OnceCell::new(),
            factions: OnceCell::new(),
            goods: OnceCell::new(),
            goods_folded: OnceCell::new(),
            markets: OnceCell::new(),
            commodities: OnceCell::new(),
            ships: OnceCell::new(),
            equipment: OnceCell::new(),
            contents: RwLock::new(HashMap::new()),
            resources: OnceCell::new(),
        })
    }

    pub fn root(&self) -> &Path {
        self.install.root()
    }

    pub fn install(&self) -> &InstallDir {
        &self.install
    }

    /// Every section of every file declared for an inventory category.
    /// A file that fails to decode is skipped with a warning; the others
    /// still contribute.
    fn load_category(&self, category: &str) -> Vec<Section> {
        let mut sections = Vec::new();
        for path in self.install.ini_paths(category) {
            match formats::load(path) {
                Ok(mut loaded) => sections.append(&mut loaded),
                Err(e) => warn!("skipping {}: {e}", path.display()),
            }
        }
        sections
    }

    /// All star systems declared in the universe files.
    pub fn systems(&self) -> &EntitySet<System> {
        self.systems.get_or_init(|| {
            self.load_category("universe")
                .iter()
                .filter(|s| s.name == "system")
                .filter_map(System::from_section)
                .collect()
        })
    }

    /// All bases declared in the universe files.
    pub fn bases(&self) -> &EntitySet<Base> {
        self.bases.get_or_init(|| {
            self.load_category("universe")
                .iter()
                .filter(|s| s.name == "base")
                .filter_map(Base::from_section)
                .collect()
        })
    }

    /// All factions, with reputation sheets and NPC properties attached.
    pub fn factions(&self) -> &EntitySet<Faction> {
        self.factions.get_or_init(|| {
            let mut factions: Vec<Faction> = self
                .load_category("initial_world")
                .iter()
                .filter(|s| s.name == "group")
                .filter_map(Faction::from_section)
                .collect();

            let props_path = self.install.data_path("missions/faction_prop.ini");
            match formats::load(&props_path) {
                Ok(sections) => {
                    let index: HashMap<String, usize> = factions
                        .iter()
                        .enumerate()
                        .map(|(i, f)| (f.nickname.clone(), i))
                        .collect();
                    for section in sections.iter().filter(|s| s.name == "factionprops") {
                        let Some(affiliation) =
                            section.string("affiliation").map(str::to_ascii_lowercase)
                        else {
                            continue;
                        };
                        match index.get(&affiliation) {
                            Some(&i) => factions[i].attach_props(section),
                            None => note_dangling("faction_prop.ini", &affiliation),
                        }
                    }
                }
                Err(e) => warn!("skipping faction properties: {e}"),
            }
            factions.into_iter().collect()
        })
    }

    /// All `[Good]` wrappers from the goods files.
    pub fn goods(&self) -> &EntitySet<Good> {
        self.goods.get_or_init(|| {
            self.load_category("goods")
                .iter()
                .filter(|s| s.name == "good")
                .filter_map(Good::from_section)
                .collect()
        })
    }

    /// Goods keyed the way the rest of the data references them: a ship
    /// hull good under its ship's nickname, a ship package under its
    /// hull's nickname, anything else under its own.
    fn goods_folded(&self) -> &HashMap<String, Good> {
        self.goods_folded.get_or_init(|| {
            let mut folded = HashMap::new();
            for good in self.goods() {
                let key = match good.category.as_str() {
                    "shiphull" => good.ship.clone(),
                    "ship" => good.hull.clone(),
                    _ => Some(good.nickname.clone()),
                };
                match key {
                    Some(key) => {
                        folded.insert(key, good.clone());
                    }
                    None => warn!(
                        good = good.nickname.as_str(),
                        "ship good without its linking field"
                    ),
                }
            }
            folded
        })
    }

    /// The bidirectional market index: base nickname to its goods, good
    /// nickname to its bases, with effective prices.
    fn markets(&self) -> &HashMap<String, MarketEntry> {
        self.markets.get_or_init(|| {
            let mut markets: HashMap<String, MarketEntry> = HashMap::new();
            for section in self
                .load_category("markets")
                .iter()
                .filter(|s| s.name == "basegood")
            {
                let Some(base) = section.string("base").map(str::to_ascii_lowercase) else {
                    continue;
                };
                for market_good in section
                    .get_all("marketgood")
                    .filter_map(MarketGood::from_entry)
                {
                    let Some(list_price) = self.good_price(&market_good.good) else {
                        note_dangling(&base, &market_good.good);
                        continue;
                    };
                    let price = list_price * market_good.price_multiplier;
                    if market_good.is_sold() {
                        markets
                            .entry(base.clone())
                            .or_default()
                            .sells
                            .push((market_good.good.clone(), price));
                        markets
                            .entry(market_good.good.clone())
                            .or_default()
                            .sells
                            .push((base.clone(), price));
                    } else {
                        markets
                            .entry(base.clone())
                            .or_default()
                            .buys
                            .push((market_good.good.clone(), price));
                        markets
                            .entry(market_good.good.clone())
                            .or_default()
                            .buys
                            .push((base.clone(), price));
                    }
                }
            }
            markets
        })
    }

    /// The list price of a good, following a ship package down to its
    /// hull when the package itself carries no price.
    fn good_price(&self, nickname: &str) -> Option<f32> {
        let good = self
            .goods()
            .get(nickname)
            .or_else(|| self.goods_folded().get(nickname))?;
        if good.price > 0.0 {
            return Some(good.price);
        }
        match &good.hull {
            Some(hull) => self.goods().get(hull).map(|h| h.price),
            None => Some(good.price),
        }
    }

    fn market_for(&self, nickname: &str) -> MarketEntry {
        self.markets().get(nickname).cloned().unwrap_or_default()
    }

    /// The market view for a base or good nickname: what it sells and
    /// buys, with effective prices. Empty for a nickname with no market.
    pub fn market_of(&self, nickname: &str) -> MarketEntry {
        self.market_for(&nickname.to_ascii_lowercase())
    }

    /// All commodities, enriched with their good (price, icon) and market.
    pub fn commodities(&self) -> &EntitySet<Commodity> {
        self.commodities.get_or_init(|| {
            self.load_category("equipment")
                .iter()
                .filter(|s| s.name == "commodity")
                .filter_map(Commodity::from_section)
                .map(|mut commodity| {
                    if let Some(good) = self.goods().get(&commodity.nickname) {
                        commodity.price = good.price;
                        commodity.item_icon = good.item_icon.clone();
                    }
                    commodity.market = self.market_for(&commodity.nickname);
                    commodity
                })
                .collect()
        })
    }

    /// All player-flyable ships, linked through their hull and package
    /// goods. A ship with no goods entry is not sold anywhere and is
    /// omitted, as the game's own ship dealers would.
    pub fn ships(&self) -> &EntitySet<Ship> {
        self.ships.get_or_init(|| {
            self.load_category("ships")
                .iter()
                .filter(|s| s.name == "ship")
                .filter_map(Ship::from_section)
                .filter_map(|mut ship| {
                    let folded = self.goods_folded();
                    let Some(hull) = folded.get(&ship.nickname) else {
                        debug!(ship = ship.nickname.as_str(), "ship has no hull good");
                        return None;
                    };
                    let Some(package) = folded.get(&hull.nickname) else {
                        debug!(ship = ship.nickname.as_str(), "ship has no package good");
                        return None;
                    };
                    ship.price = hull.price;
                    ship.item_icon = hull.item_icon.clone();
                    ship.addons = package.addons.clone();
                    ship.market = self.market_for(&package.nickname);
                    Some(ship)
                })
                .collect()
        })
    }

    /// All mountable/carryable equipment from the equipment files.
    pub fn equipment(&self) -> &EntitySet<Equipment> {
        self.equipment.get_or_init(|| {
            self.load_category("equipment")
                .iter()
                .filter(|s| EQUIPMENT_KINDS.contains(&s.name.as_str()))
                .filter_map(Equipment::from_section)
                .map(|mut item| {
                    item.market = self.market_for(&item.nickname);
                    item
                })
                .collect()
        })
    }

    /// Everything fixed in space in `system`, built from its definition
    /// file on first request and cached for the life of this registry.
    pub fn system_contents(&self, system: &System) -> Arc<EntitySet<Solar>> {
        if let Some(cached) = self.contents.read().get(&system.nickname) {
            return cached.clone();
        }

        let built = Arc::new(self.build_system_contents(system));
        let mut cache = self.contents.write();
        // another reader may have built it while we were parsing
        cache
            .entry(system.nickname.clone())
            .or_insert(built)
            .clone()
    }

    fn build_system_contents(&self, system: &System) -> EntitySet<Solar> {
        // system files are declared relative to the directory holding
        // universe.ini
        let Some(universe_dir) = self
            .install
            .ini_paths("universe")
            .first()
            .and_then(|p| p.parent())
        else {
            return EntitySet::new();
        };
        let path = resolve_case(universe_dir, &system.file)
            .unwrap_or_else(|| universe_dir.join(&system.file));

        let sections = match formats::load(&path) {
            Ok(sections) => sections,
            Err(e) => {
                warn!(system = system.nickname.as_str(), "skipping system file: {e}");
                return EntitySet::new();
            }
        };
        sections
            .iter()
            .filter_map(|section| match section.name.as_str() {
                "object" => Solar::from_object_section(section, &system.nickname),
                "zone" => Solar::from_zone_section(section, &system.nickname),
                _ => None,
            })
            .collect()
    }

    /// The lanes of `system`: each maximal chain of trade lane rings, in
    /// ring order.
    pub fn system_lanes(&self, system: &System) -> Vec<Vec<Solar>> {
        solars::reconstruct_lanes(&self.system_contents(system))
    }

    /// The destination system of a jump conduit, when it resolves.
    pub fn jump_destination(&self, jump: &Solar) -> Option<&System> {
        let to_system = &jump.as_jump()?.to_system;
        let destination = self.systems().get(to_system);
        if destination.is_none() {
            note_dangling(&jump.nickname, to_system);
        }
        destination
    }

    fn resources(&self) -> &Resources {
        self.resources.get_or_init(|| {
            let mut resources = Resources::default();
            for (slot, path) in self.install.dll_paths().iter().enumerate() {
                let data = match fs::read(path) {
                    Ok(data) => data,
                    Err(e) => {
                        warn!("skipping resource DLL {}: {e}", path.display());
                        continue;
                    }
                };
                match dll::parse(&data, slot as u32 * IDS_PER_DLL) {
                    Ok(decoded) => {
                        // declared order is the tie-break: a later DLL
                        // overrides earlier ids on collision
                        resources.strings.extend(decoded.strings);
                        resources.infocards.extend(decoded.infocards);
                    }
                    Err(e) => warn!("skipping resource DLL {}: {e}", path.display()),
                }
            }
            resources
        })
    }

    /// The string behind a name resource id. A missing id yields the
    /// deterministic sentinel `<ids_name: N>`; no id at all is an empty
    /// string, which is how the game treats nameless entities.
    pub fn resolve_name(&self, id: Option<u32>) -> String {
        let Some(id) = id else {
            return String::new();
        };
        match self.resources().strings.get(&id) {
            Some(text) => text.clone(),
            None => format!("<ids_name: {id}>"),
        }
    }

    /// The infocard behind a resource id, converted per `markup`. Some
    /// infocards are stored as plain string-table entries, so both tables
    /// are consulted.
    pub fn resolve_infocard(&self, id: Option<u32>, markup: Markup) -> String {
        let Some(id) = id else {
            return String::new();
        };
        let resources = self.resources();
        let Some(raw) = resources
            .infocards
            .get(&id)
            .or_else(|| resources.strings.get(&id))
        else {
            return format!("<ids_info: {id}>");
        };
        match markup {
            Markup::Rdl => raw.clone(),
            Markup::Html => rdl::to_html(raw),
            Markup::Plain => rdl::to_plain(raw),
        }
    }

    /// The display name of any entity.
    pub fn name_of(&self, entity: &impl Entity) -> String {
        self.resolve_name(entity.ids_name())
    }

    /// The infocard of any entity. `Base` and `Ship` have composite
    /// infocards; see [`base_infocard`](Self::base_infocard) and
    /// [`ship_infocard`](Self::ship_infocard).
    pub fn infocard_of(&self, entity: &impl Entity, markup: Markup) -> String {
        self.resolve_infocard(entity.ids_info(), markup)
    }

    /// A base's infocard lives on its solar, in two parts: the
    /// specifications at `ids_info` and the description at `ids_info + 1`.
    pub fn base_infocard(&self, base: &Base, markup: Markup) -> String {
        let Some(solar) = base.solar(self) else {
            return String::new();
        };
        let Some(ids_info) = solar.ids_info else {
            return String::new();
        };
        join_infocard_parts(
            markup,
            [
                self.resolve_infocard(Some(ids_info), markup),
                self.resolve_infocard(Some(ids_info + 1), markup),
            ],
        )
    }

    /// A ship's infocard is stored in four parts, joined in the display
    /// order of the in-game ship dealer.
    pub fn ship_infocard(&self, ship: &Ship, markup: Markup) -> String {
        join_infocard_parts(
            markup,
            ship.infocard_ids()
                .map(|id| self.resolve_infocard(Some(id), markup)),
        )
    }

    /// Pull a good's icon out of its `.3db` container: the TGA bytes of
    /// the `MIP0` leaf, or `None` when the container has no such node.
    pub fn good_icon(&self, good: &Good) -> Result<Option<Vec<u8>>> {
        let path = self.install.data_path(good.icon_path());
        let data = fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.clone())
            } else {
                Error::Io(e)
            }
        })?;
        let tree = UtfFile::parse(&data)?;
        Ok(tree.find("MIP0").map(<[u8]>::to_vec))
    }
}

fn join_infocard_parts(markup: Markup, parts: impl IntoIterator<Item = String>) -> String {
    let separator = match markup {
        Markup::Plain => "\n",
        Markup::Html | Markup::Rdl => "<p>",
    };
    parts
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Log a reference that did not resolve. Readers treat it as an absence.
pub(crate) fn note_dangling(from: &str, to: &str) {
    let diagnostic = Error::DanglingReference {
        from: from.to_string(),
        to: to.to_string(),
    };
    warn!("{diagnostic}");
}

static DEFAULT: Lazy<RwLock<Option<Arc<Freelancer>>>> = Lazy::new(|| RwLock::new(None));

/// Configure the process-wide default installation. Replacing the path
/// discards every cache; readers holding entities from the old root keep
/// a consistent stale snapshot.
pub fn set_install_path(root: impl AsRef<Path>) -> Result<()> {
    let freelancer = Arc::new(Freelancer::open(root)?);
    *DEFAULT.write() = Some(freelancer);
    Ok(())
}

/// The process-wide default installation, if one has been configured.
pub fn installation() -> Option<Arc<Freelancer>> {
    DEFAULT.read().clone()
}
