//! Typed entities and the collections that hold them
//!
//! Everything Freelancer defines - systems, bases, factions, goods, the
//! solar objects inside a system - is distinguished by a *nickname*, a
//! short ASCII identifier unique within its type. Entities are plain
//! immutable records built once from the parsed sections; anything that
//! crosses file boundaries stays a nickname and is resolved through the
//! [`Freelancer`](crate::registry::Freelancer) registry at lookup time, so
//! a dangling reference in a broken mod reads as an absence, not an error.

pub mod goods;
pub mod solars;
pub mod universe;

use std::collections::HashMap;

use tracing::warn;

use crate::error::Error;

/// Common surface of every entity record.
pub trait Entity {
    /// Collection name used in diagnostics.
    const KIND: &'static str;

    /// The unique (per type) identifier of this entity.
    fn nickname(&self) -> &str;

    /// Resource id of the display name, if any.
    fn ids_name(&self) -> Option<u32> {
        None
    }

    /// Resource id of the infocard, if any.
    fn ids_info(&self) -> Option<u32> {
        None
    }
}

/// An insertion-ordered collection of entities indexed by nickname.
///
/// Sets are immutable once built. Filtering and union produce new sets;
/// iteration order is always insertion (i.e. file) order.
#[derive(Debug, Clone)]
pub struct EntitySet<T> {
    items: Vec<T>,
    by_nickname: HashMap<String, usize>,
}

impl<T: Entity> EntitySet<T> {
    pub fn new() -> Self {
        EntitySet {
            items: Vec::new(),
            by_nickname: HashMap::new(),
        }
    }

    /// Look up an entity by nickname, case-insensitively. O(1).
    pub fn get(&self, nickname: &str) -> Option<&T> {
        self.by_nickname
            .get(&nickname.to_ascii_lowercase())
            .map(|&i| &self.items[i])
    }

    pub fn contains(&self, nickname: &str) -> bool {
        self.by_nickname.contains_key(&nickname.to_ascii_lowercase())
    }

    /// Entities in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// The first entity in the set, if any.
    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn insert(&mut self, entity: T) {
        let key = entity.nickname().to_ascii_lowercase();
        match self.by_nickname.get(&key) {
            // last write wins, keeping the original position
            Some(&i) => {
                let collision = Error::CollisionOnNickname {
                    kind: T::KIND,
                    nickname: key,
                };
                warn!("{collision}");
                self.items[i] = entity;
            }
            None => {
                self.by_nickname.insert(key, self.items.len());
                self.items.push(entity);
            }
        }
    }
}

impl<T: Entity + Clone> EntitySet<T> {
    /// Entities matching `predicate`, in the same order.
    pub fn filter(&self, predicate: impl Fn(&T) -> bool) -> EntitySet<T> {
        self.iter().filter(|&e| predicate(e)).cloned().collect()
    }

    /// A new set holding the entities of both; entries in `other` override
    /// entries here on nickname collision.
    pub fn union(&self, other: &EntitySet<T>) -> EntitySet<T> {
        let mut merged = EntitySet::new();
        for entity in self.iter().chain(other.iter()) {
            let key = entity.nickname().to_ascii_lowercase();
            match merged.by_nickname.get(&key) {
                Some(&i) => merged.items[i] = entity.clone(),
                None => {
                    merged.by_nickname.insert(key, merged.items.len());
                    merged.items.push(entity.clone());
                }
            }
        }
        merged
    }
}

impl<T: Entity> Default for EntitySet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> FromIterator<T> for EntitySet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = EntitySet::new();
        for entity in iter {
            set.insert(entity);
        }
        set
    }
}

impl<'a, T: Entity> IntoIterator for &'a EntitySet<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T> IntoIterator for EntitySet<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Probe {
        nickname: String,
        tag: u32,
    }

    impl Probe {
        fn new(nickname: &str, tag: u32) -> Self {
            Probe {
                nickname: nickname.into(),
                tag,
            }
        }
    }

    impl Entity for Probe {
        const KIND: &'static str = "probe";

        fn nickname(&self) -> &str {
            &self.nickname
        }
    }

    fn set(probes: &[(&str, u32)]) -> EntitySet<Probe> {
        probes.iter().map(|&(n, t)| Probe::new(n, t)).collect()
    }

    #[test]
    fn test_get_returns_the_inserted_entity() {
        let s = set(&[("li01", 1), ("br01", 2)]);
        assert_eq!(s.get("li01").unwrap().tag, 1);
        assert_eq!(s.get("BR01").unwrap().tag, 2);
        assert!(s.get("ku01").is_none());
        for e in &s {
            assert_eq!(s.get(e.nickname()).unwrap(), e);
        }
    }

    #[test]
    fn test_iteration_preserves_insertion_order() {
        let s = set(&[("c", 0), ("a", 1), ("b", 2)]);
        let order: Vec<_> = s.iter().map(|e| e.nickname.as_str()).collect();
        assert_eq!(order, ["c", "a", "b"]);
    }

    #[test]
    fn test_collision_last_write_wins_in_place() {
        let s = set(&[("a", 1), ("b", 2), ("a", 3)]);
        assert_eq!(s.len(), 2);
        assert_eq!(s.get("a").unwrap().tag, 3);
        let order: Vec<_> = s.iter().map(|e| e.tag).collect();
        assert_eq!(order, [3, 2]);
    }

    #[test]
    fn test_filter_preserves_order() {
        let s = set(&[("a", 1), ("b", 2), ("c", 3)]);
        let odd = s.filter(|e| e.tag % 2 == 1);
        let order: Vec<_> = odd.iter().map(|e| e.tag).collect();
        assert_eq!(order, [1, 3]);
    }

    #[test]
    fn test_union_right_side_overrides() {
        let left = set(&[("a", 1), ("b", 2)]);
        let right = set(&[("b", 20), ("c", 30)]);
        let merged = left.union(&right);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.get("b").unwrap().tag, 20);
    }

    #[test]
    fn test_union_with_empty_is_identity() {
        let s = set(&[("a", 1), ("b", 2)]);
        let empty = EntitySet::new();
        let via_left = s.union(&empty);
        let via_right = empty.union(&s);
        for merged in [via_left, via_right] {
            let order: Vec<_> = merged.iter().map(|e| e.tag).collect();
            assert_eq!(order, [1, 2]);
        }
    }

    #[test]
    fn test_union_is_associative() {
        let a = set(&[("x", 1)]);
        let b = set(&[("x", 2), ("y", 2)]);
        let c = set(&[("y", 3), ("z", 3)]);
        let left_first = a.union(&b).union(&c);
        let right_first = a.union(&b.union(&c));
        let flat = |s: &EntitySet<Probe>| -> Vec<(String, u32)> {
            s.iter().map(|e| (e.nickname.clone(), e.tag)).collect()
        };
        assert_eq!(flat(&left_first), flat(&right_first));
    }
}
