//! Side tables of one realm's half of a membrane.
//!
//! `PointerRegistry` owns the realm's exported objects: one id per object, kept alive
//! while the other realm holds a proxy for it. `ProxyTable` maps the other realm's ids to
//! the proxies (or linked values) standing in for them here, without keeping proxies
//! alive. Together the two halves of an environment are inverses of each other:
//! `blue.exports[id] == b` exactly when `red.imports[id]` is the proxy for `b`.

use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::membrane::pointer::PointerTraits;
use crate::runner::ds::object::{JsObjectType, ObjectType};
use std::cell::RefCell;

fn address_of(o: &JsObjectType) -> usize {
    Rc::as_ptr(o) as *const () as usize
}

struct ExportEntry {
    object: JsObjectType,
    traits: PointerTraits,
    count: usize,
    pinned: bool,
}

pub struct PointerRegistry {
    next_id: u64,
    by_id: HashMap<u64, ExportEntry>,
    by_address: HashMap<usize, u64>,
}
impl PointerRegistry {
    pub fn new() -> Self {
        PointerRegistry {
            next_id: 1,
            by_id: HashMap::new(),
            by_address: HashMap::new(),
        }
    }

    /// Counts one more reference to an already exported object.
    pub fn retain(&mut self, o: &JsObjectType) -> Option<(u64, PointerTraits)> {
        let id = *self.by_address.get(&address_of(o))?;
        let entry = self.by_id.get_mut(&id)?;
        entry.count += 1;
        Some((id, entry.traits))
    }

    /// Exports `o` with one reference, or retains the existing entry.
    pub fn insert(&mut self, o: &JsObjectType, traits: PointerTraits) -> (u64, PointerTraits) {
        if let Some(existing) = self.retain(o) {
            return existing;
        }
        let id = self.allocate(o, traits);
        if let Some(entry) = self.by_id.get_mut(&id) {
            entry.count = 1;
        }
        (id, traits)
    }

    /// Exports `o` for the lifetime of the environment.
    pub fn pin(&mut self, o: &JsObjectType, traits: PointerTraits) -> u64 {
        let id = match self.by_address.get(&address_of(o)) {
            Some(id) => *id,
            None => self.allocate(o, traits),
        };
        if let Some(entry) = self.by_id.get_mut(&id) {
            entry.pinned = true;
        }
        id
    }

    fn allocate(&mut self, o: &JsObjectType, traits: PointerTraits) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.by_address.insert(address_of(o), id);
        self.by_id.insert(
            id,
            ExportEntry {
                object: o.clone(),
                traits,
                count: 0,
                pinned: false,
            },
        );
        id
    }

    pub fn resolve(&self, id: u64) -> Option<JsObjectType> {
        self.by_id.get(&id).map(|e| e.object.clone())
    }

    /// Drops `count` references; returns the object once nothing references it any more
    /// so the caller can let it go outside any borrow.
    pub fn release(&mut self, id: u64, count: usize) -> Option<JsObjectType> {
        let entry = self.by_id.get_mut(&id)?;
        entry.count = entry.count.saturating_sub(count);
        if entry.count > 0 || entry.pinned {
            return None;
        }
        let entry = self.by_id.remove(&id)?;
        self.by_address.remove(&address_of(&entry.object));
        Some(entry.object)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn pinned_count(&self) -> usize {
        self.by_id.values().filter(|e| e.pinned).count()
    }
}
impl Default for PointerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

enum ImportEntry {
    Linked(JsObjectType, PointerTraits),
    Proxy(Weak<RefCell<ObjectType>>, PointerTraits),
}

pub struct ProxyTable {
    by_id: HashMap<u64, ImportEntry>,
    by_address: HashMap<usize, u64>,
}
impl ProxyTable {
    pub fn new() -> Self {
        ProxyTable {
            by_id: HashMap::new(),
            by_address: HashMap::new(),
        }
    }

    /// The local stand-in for foreign id `id`, if it is still alive.
    pub fn get(&self, id: u64) -> Option<JsObjectType> {
        match self.by_id.get(&id)? {
            ImportEntry::Linked(o, _) => Some(o.clone()),
            ImportEntry::Proxy(weak, _) => weak.upgrade(),
        }
    }

    pub fn is_linked(&self, id: u64) -> bool {
        matches!(self.by_id.get(&id), Some(ImportEntry::Linked(..)))
    }

    /// The foreign id `o` stands in for, when `o` is one of this table's values.
    pub fn foreign_id_of(&self, o: &JsObjectType) -> Option<(u64, PointerTraits)> {
        let id = *self.by_address.get(&address_of(o))?;
        match self.by_id.get(&id)? {
            ImportEntry::Linked(linked, traits) if Rc::ptr_eq(linked, o) => Some((id, *traits)),
            ImportEntry::Proxy(weak, traits) => match weak.upgrade() {
                Some(proxy) if Rc::ptr_eq(&proxy, o) => Some((id, *traits)),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn insert_proxy(&mut self, id: u64, proxy: &JsObjectType, traits: PointerTraits) {
        self.by_address.insert(address_of(proxy), id);
        self.by_id
            .insert(id, ImportEntry::Proxy(Rc::downgrade(proxy), traits));
    }

    pub fn link(&mut self, id: u64, local: &JsObjectType, traits: PointerTraits) {
        self.by_address.insert(address_of(local), id);
        self.by_id
            .insert(id, ImportEntry::Linked(local.clone(), traits));
    }

    /// Forgets `id` if its proxy has been dropped. A proxy re-created for the same id in
    /// the meantime is kept.
    pub fn remove_if_dead(&mut self, id: u64) -> bool {
        let dead = match self.by_id.get(&id) {
            Some(ImportEntry::Proxy(weak, _)) => weak.strong_count() == 0,
            _ => false,
        };
        if dead {
            self.by_id.remove(&id);
            self.by_address.retain(|_, v| *v != id);
        }
        dead
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn linked_count(&self) -> usize {
        self.by_id
            .values()
            .filter(|e| matches!(e, ImportEntry::Linked(..)))
            .count()
    }
}
impl Default for ProxyTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::membrane::pointer::TargetKind;
    use crate::runner::ds::object::new_object;

    fn traits() -> PointerTraits {
        PointerTraits::new(TargetKind::Object)
    }

    #[test]
    fn test_export_is_idempotent() {
        let mut registry = PointerRegistry::new();
        let o = new_object(None);
        let (a, _) = registry.insert(&o, traits());
        let (b, _) = registry.insert(&o, traits());
        assert_eq!(a, b);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_release_frees_after_last_reference() {
        let mut registry = PointerRegistry::new();
        let o = new_object(None);
        let (id, _) = registry.insert(&o, traits());
        registry.insert(&o, traits());
        assert!(registry.release(id, 1).is_none());
        assert!(registry.release(id, 1).is_some());
        assert!(registry.resolve(id).is_none());
    }

    #[test]
    fn test_pinned_entries_survive_release() {
        let mut registry = PointerRegistry::new();
        let o = new_object(None);
        let id = registry.pin(&o, traits());
        assert!(registry.release(id, 5).is_none());
        assert!(registry.resolve(id).is_some());
        assert_eq!(registry.pinned_count(), 1);
    }

    #[test]
    fn test_proxy_table_does_not_keep_proxies_alive() {
        let mut table = ProxyTable::new();
        let proxy = new_object(None);
        table.insert_proxy(7, &proxy, traits());
        assert!(table.get(7).is_some());
        assert_eq!(table.foreign_id_of(&proxy).map(|(id, _)| id), Some(7));
        assert!(!table.remove_if_dead(7));
        drop(proxy);
        assert!(table.get(7).is_none());
        assert!(table.remove_if_dead(7));
        assert!(table.is_empty());
    }

    #[test]
    fn test_linked_entries_are_strong() {
        let mut table = ProxyTable::new();
        let local = new_object(None);
        table.link(3, &local, traits());
        let address_probe = local.clone();
        drop(local);
        assert!(table.is_linked(3));
        assert!(Rc::ptr_eq(&table.get(3).unwrap(), &address_probe));
        assert!(!table.remove_if_dead(3));
    }
}
