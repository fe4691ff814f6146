//! Goods: anything that can be bought or sold
//!
//! The trade economy spreads across three sets of files. Equipment files
//! define the physical items (commodities, guns, shields, ship hulls);
//! `goods.ini` wraps each item in a `[Good]` carrying its price and icon;
//! the market files list, per base, which goods change hands and at what
//! multiplier. Ships are the awkward case: a `[Ship]` stats section, a
//! `shiphull` good and a `ship` package good chain together before a
//! market entry is reached.

use crate::entities::Entity;
use crate::formats::{Entry, Section, Value};

/// One side of the market, as seen from either a base or a good: the
/// counterparty nickname and the effective price there.
#[derive(Debug, Clone, Default)]
pub struct MarketEntry {
    /// For a base: the goods it sells. For a good: the bases selling it.
    pub sells: Vec<(String, f32)>,
    /// For a base: the goods it buys. For a good: the bases buying it.
    pub buys: Vec<(String, f32)>,
}

impl MarketEntry {
    pub fn sells_price(&self, nickname: &str) -> Option<f32> {
        self.sells
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(nickname))
            .map(|&(_, price)| price)
    }

    pub fn buys_price(&self, nickname: &str) -> Option<f32> {
        self.buys
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(nickname))
            .map(|&(_, price)| price)
    }
}

/// A `[Good]` section from `goods.ini`: the tradeable wrapper around an
/// item, hull or ship package.
#[derive(Debug, Clone)]
pub struct Good {
    pub nickname: String,
    pub category: String,
    pub price: f32,
    /// Path of the `.3db` icon container, relative to `DATA`.
    pub item_icon: Option<String>,
    /// For a `shiphull` good: the ship stats nickname it belongs to.
    pub ship: Option<String>,
    /// For a `ship` (package) good: the hull good it wraps.
    pub hull: Option<String>,
    /// For a package: the equipment mounted out of the box.
    pub addons: Vec<String>,
}

impl Entity for Good {
    const KIND: &'static str = "good";

    fn nickname(&self) -> &str {
        &self.nickname
    }
}

impl Good {
    pub(crate) fn from_section(section: &Section) -> Option<Self> {
        Some(Good {
            nickname: section.string("nickname")?.to_ascii_lowercase(),
            category: section.string("category")?.to_ascii_lowercase(),
            price: section.float("price").unwrap_or(0.0),
            item_icon: section.string("item_icon").map(str::to_string),
            ship: section.string("ship").map(str::to_ascii_lowercase),
            hull: section.string("hull").map(str::to_ascii_lowercase),
            addons: section
                .get_all("addon")
                .filter_map(|e| e.first().and_then(Value::as_str))
                .map(str::to_ascii_lowercase)
                .collect(),
        })
    }

    /// Icon container path relative to `DATA`, falling back to the stock
    /// blank icon the game uses for goods without one.
    pub fn icon_path(&self) -> &str {
        self.item_icon
            .as_deref()
            .unwrap_or("EQUIPMENT/MODELS/COMMODITIES/NN_ICONS/blank.3db")
    }
}

/// A commodity: a good in tradeable, transportable form.
#[derive(Debug, Clone)]
pub struct Commodity {
    pub nickname: String,
    pub ids_name: Option<u32>,
    pub ids_info: Option<u32>,
    /// Cargo bay volume of one unit.
    pub volume: f32,
    pub decay_per_second: f32,
    pub price: f32,
    pub item_icon: Option<String>,
    pub market: MarketEntry,
}

impl Entity for Commodity {
    const KIND: &'static str = "commodity";

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

impl Commodity {
    pub(crate) fn from_section(section: &Section) -> Option<Self> {
        Some(Commodity {
            nickname: section.string("nickname")?.to_ascii_lowercase(),
            ids_name: section.resource_id("ids_name"),
            ids_info: section.resource_id("ids_info"),
            volume: section.float("volume").unwrap_or(0.0),
            decay_per_second: section.float("decay_per_second").unwrap_or(0.0),
            price: 0.0,
            item_icon: None,
            market: MarketEntry::default(),
        })
    }

    /// Bases selling this commodity, with prices.
    pub fn sold_at(&self) -> &[(String, f32)] {
        &self.market.sells
    }

    /// Bases buying this commodity, with prices.
    pub fn bought_at(&self) -> &[(String, f32)] {
        &self.market.buys
    }
}

/// A flyable star ship.
#[derive(Debug, Clone)]
pub struct Ship {
    pub nickname: String,
    pub ids_name: Option<u32>,
    pub ids_info: Option<u32>,
    /// The infocard is stored in four parts; see [`Ship::infocard_ids`].
    pub ids_info1: Option<u32>,
    pub ids_info2: Option<u32>,
    pub ids_info3: Option<u32>,
    pub ship_class: i32,
    pub hit_pts: f32,
    pub hold_size: f32,
    pub nanobot_limit: i32,
    pub shield_battery_limit: i32,
    pub steering_torque: (f32, f32, f32),
    pub angular_drag: (f32, f32, f32),
    pub price: f32,
    pub item_icon: Option<String>,
    /// Equipment mounted on the stock package.
    pub addons: Vec<String>,
    pub market: MarketEntry,
}

impl Entity for Ship {
    const KIND: &'static str = "ship";

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

/// Ship class id to displayed type name. Ids above 2 come from popular
/// mods (notably Discovery) rather than the vanilla game.
const SHIP_CLASS_NAMES: &[(i32, &str)] = &[
    (0, "Light Fighter"),
    (1, "Heavy Fighter"),
    (2, "Freighter"),
    (3, "Very Heavy Fighter"),
    (4, "Super Heavy Fighter"),
    (5, "Bomber"),
    (6, "Transport"),
    (7, "Transport"),
    (8, "Transport"),
    (9, "Transport"),
    (10, "Transport"),
    (11, "Gunboat"),
    (12, "Gunboat"),
    (13, "Cruiser"),
    (14, "Cruiser"),
    (15, "Cruiser"),
    (16, "Battleship"),
    (17, "Battleship"),
    (18, "Battleship"),
    (19, "Freighter"),
];

impl Ship {
    pub(crate) fn from_section(section: &Section) -> Option<Self> {
        // ships the player can never buy lack the extended infocard set;
        // they are NPC-only hulls and not part of the goods graph
        section.get("ids_info3")?;
        Some(Ship {
            nickname: section.string("nickname")?.to_ascii_lowercase(),
            ids_name: section.resource_id("ids_name"),
            ids_info: section.resource_id("ids_info"),
            ids_info1: section.resource_id("ids_info1"),
            ids_info2: section.resource_id("ids_info2"),
            ids_info3: section.resource_id("ids_info3"),
            ship_class: section.int("ship_class").unwrap_or(0),
            hit_pts: section.float("hit_pts").unwrap_or(0.0),
            hold_size: section.float("hold_size").unwrap_or(0.0),
            nanobot_limit: section.int("nanobot_limit").unwrap_or(0),
            shield_battery_limit: section.int("shield_battery_limit").unwrap_or(0),
            steering_torque: section.vec3("steering_torque").unwrap_or_default(),
            angular_drag: section.vec3("angular_drag").unwrap_or_default(),
            price: 0.0,
            item_icon: None,
            addons: Vec::new(),
            market: MarketEntry::default(),
        })
    }

    /// The displayed name of this ship's class.
    pub fn class_name(&self) -> &'static str {
        SHIP_CLASS_NAMES
            .iter()
            .find(|(id, _)| *id == self.ship_class)
            .map(|&(_, name)| name)
            .unwrap_or("Unknown")
    }

    /// Turn rate in degrees per second, derived the way the in-game stats
    /// screen does it.
    pub fn turn_rate(&self) -> f32 {
        let avg = |(x, y, z): (f32, f32, f32)| (x + y + z) / 3.0;
        let drag = avg(self.angular_drag);
        if drag == 0.0 {
            return 0.0;
        }
        (avg(self.steering_torque) / drag).to_degrees()
    }

    /// The infocard resource ids in display order. The game shows part 1
    /// before the base `ids_info`, then parts 2 and 3.
    pub fn infocard_ids(&self) -> impl Iterator<Item = u32> + '_ {
        [self.ids_info1, self.ids_info, self.ids_info2, self.ids_info3]
            .into_iter()
            .flatten()
    }
}

/// A piece of equipment: anything mountable on a ship or carried in its
/// hold that is not a commodity.
#[derive(Debug, Clone)]
pub struct Equipment {
    pub nickname: String,
    pub ids_name: Option<u32>,
    pub ids_info: Option<u32>,
    /// The defining section name: `gun`, `shieldgenerator`, `thruster`, ...
    pub kind: String,
    pub lootable: bool,
    pub volume: f32,
    pub hit_pts: Option<f32>,
    pub market: MarketEntry,
}

impl Entity for Equipment {
    const KIND: &'static str = "equipment";

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

/// Section names in the equipment files that define mountable or
/// carryable items. The files also hold effect and rendering sections
/// (`[Light]`, `[LOD]`, `[Explosion]`, ...) which are not entities.
pub(crate) const EQUIPMENT_KINDS: &[&str] = &[
    "gun",
    "munition",
    "mine",
    "minedropper",
    "countermeasure",
    "countermeasuredropper",
    "shieldgenerator",
    "shieldbattery",
    "thruster",
    "power",
    "engine",
    "tractor",
    "scanner",
    "repairkit",
    "armor",
    "cargopod",
    "cloakingdevice",
];

impl Equipment {
    pub(crate) fn from_section(section: &Section) -> Option<Self> {
        Some(Equipment {
            nickname: section.string("nickname")?.to_ascii_lowercase(),
            ids_name: section.resource_id("ids_name"),
            ids_info: section.resource_id("ids_info"),
            kind: section.name.clone(),
            lootable: section.boolean("lootable").unwrap_or(false),
            volume: section.float("volume").unwrap_or(0.0),
            hit_pts: section.float("hit_pts"),
            market: MarketEntry::default(),
        })
    }
}

/// One `marketgood` tuple of a `[BaseGood]` section:
/// `good, min level, min rep, min stock, max stock, depreciation, multiplier`.
/// A good is sold at the base only when both stock bounds are non-zero;
/// otherwise the base merely buys it.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketGood {
    pub good: String,
    pub min_stock: f32,
    pub max_stock: f32,
    pub price_multiplier: f32,
}

impl MarketGood {
    pub(crate) fn from_entry(entry: &Entry) -> Option<Self> {
        match entry.values.as_slice() {
            [Value::Str(good), _, _, min_stock, max_stock, _, multiplier, ..] => Some(MarketGood {
                good: good.to_ascii_lowercase(),
                min_stock: min_stock.as_f32()?,
                max_stock: max_stock.as_f32()?,
                price_multiplier: multiplier.as_f32()?,
            }),
            _ => None,
        }
    }

    pub fn is_sold(&self) -> bool {
        self.min_stock != 0.0 && self.max_stock != 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::ini;

    #[test]
    fn test_good_parsing() {
        let sections = ini::parse(
            b"[Good]\nnickname = commodity_gold\ncategory = commodity\nprice = 1400\nitem_icon = equipment\\models\\commodities\\nn_icons\\gold.3db\n",
            "goods.ini",
        );
        let good = Good::from_section(&sections[0]).unwrap();
        assert_eq!(good.nickname, "commodity_gold");
        assert_eq!(good.price, 1400.0);
        assert!(good.icon_path().ends_with("gold.3db"));
    }

    #[test]
    fn test_good_icon_fallback() {
        let sections = ini::parse(
            b"[Good]\nnickname = x\ncategory = commodity\nprice = 1\n",
            "goods.ini",
        );
        let good = Good::from_section(&sections[0]).unwrap();
        assert!(good.icon_path().ends_with("blank.3db"));
    }

    #[test]
    fn test_ship_requires_full_infocard_set() {
        let sections = ini::parse(
            b"[Ship]\nnickname = npc_only\nids_name = 1\nids_info = 2\n",
            "shiparch.ini",
        );
        assert!(Ship::from_section(&sections[0]).is_none());
    }

    #[test]
    fn test_ship_stats() {
        let sections = ini::parse(
            b"[Ship]\nnickname = li_elite\nids_name = 237033\nids_info = 66567\n\
              ids_info1 = 66534\nids_info2 = 66535\nids_info3 = 66536\nship_class = 1\n\
              steering_torque = 30000, 30000, 30000\nangular_drag = 15000, 15000, 15000\n",
            "shiparch.ini",
        );
        let ship = Ship::from_section(&sections[0]).unwrap();
        assert_eq!(ship.class_name(), "Heavy Fighter");
        assert!((ship.turn_rate() - 2.0f32.to_degrees()).abs() < 1e-3);
        let ids: Vec<_> = ship.infocard_ids().collect();
        assert_eq!(ids, [66534, 66567, 66535, 66536]);
    }

    #[test]
    fn test_turn_rate_with_zero_drag() {
        let sections = ini::parse(
            b"[Ship]\nnickname = s\nids_info3 = 1\nsteering_torque = 1, 1, 1\n",
            "shiparch.ini",
        );
        assert_eq!(Ship::from_section(&sections[0]).unwrap().turn_rate(), 0.0);
    }

    #[test]
    fn test_marketgood_sold_rule() {
        let sections = ini::parse(
            b"[BaseGood]\nbase = li01_01_base\n\
              marketgood = commodity_gold, 0, -1, 10, 50, 0, 1.2\n\
              marketgood = commodity_scrap, 0, -1, 0, 0, 0, 0.8\n",
            "market_commodities.ini",
        );
        let goods: Vec<_> = sections[0]
            .get_all("marketgood")
            .filter_map(MarketGood::from_entry)
            .collect();
        assert_eq!(goods.len(), 2);
        assert!(goods[0].is_sold());
        assert_eq!(goods[0].price_multiplier, 1.2);
        assert!(!goods[1].is_sold());
    }
}
