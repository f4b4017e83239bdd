use std::sync::Mutex;

use crate::vm::scanning::{
    process_weak_slot, update_slot, visit_slot, RootType, RootUpdater, RootVisitor,
    WeakRootVisitor,
};
use crate::vm::slot::SimpleSlot;

/// A set of root slots registered by the runtime.
///
/// Visiting works on a copy of the slots taken under the lock, and the visitor runs with the lock
/// released.  A visitor may therefore add or remove slots of the list it is visiting, and a panic
/// in a visitor leaves the list usable.  Slots are visited in registration order.
pub struct RootList {
    kind: RootType,
    slots: Mutex<Vec<SimpleSlot>>,
}

impl RootList {
    pub fn new(kind: RootType) -> Self {
        RootList {
            kind,
            slots: Mutex::new(vec![]),
        }
    }

    pub fn kind(&self) -> RootType {
        self.kind
    }

    /// Register a slot.  The slot must stay valid until it is removed and no visit that started
    /// before the removal is still running.
    pub fn add(&self, slot: SimpleSlot) {
        let mut slots = self.slots.lock().unwrap();
        debug_assert!(
            !slots.contains(&slot),
            "{:?} is already a {} root",
            slot,
            self.kind
        );
        slots.push(slot);
    }

    /// Unregister a slot.  Returns false if the slot was not registered.
    pub fn remove(&self, slot: SimpleSlot) -> bool {
        let mut slots = self.slots.lock().unwrap();
        if let Some(index) = slots.iter().position(|s| *s == slot) {
            slots.remove(index);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, slot: SimpleSlot) -> bool {
        self.slots.lock().unwrap().contains(&slot)
    }

    pub fn len(&self) -> usize {
        self.slots.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Vec<SimpleSlot> {
        self.slots.lock().unwrap().clone()
    }

    /// Report every non-null slot as a strong root.
    pub fn visit<V: RootVisitor + ?Sized>(&self, visitor: &mut V) {
        for slot in self.snapshot() {
            visit_slot(self.kind, slot, visitor);
        }
    }

    /// Apply weak semantics to every non-null slot.
    pub fn sweep<W: WeakRootVisitor + ?Sized>(&self, visitor: &mut W) {
        let mut cleared = 0;
        for slot in self.snapshot() {
            if slot.load().is_some() && !process_weak_slot(slot, visitor) {
                cleared += 1;
            }
        }
        if cleared > 0 {
            trace!("Cleared {} {} roots", cleared, self.kind);
        }
    }

    /// Rewrite every non-null slot with what `updater` returns.
    pub fn update<U: RootUpdater + ?Sized>(&self, updater: &mut U) {
        for slot in self.snapshot() {
            update_slot(slot, updater);
        }
    }
}

impl std::fmt::Debug for RootList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootList")
            .field("kind", &self.kind)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::{Address, ObjectReference};
    use crate::vm::scanning::GCRoot;
    use atomic::Atomic;

    fn object(raw: usize) -> ObjectReference {
        ObjectReference::from_raw_address(unsafe { Address::from_usize(raw) }).unwrap()
    }

    #[test]
    fn add_remove() {
        let cell = Atomic::new(Address::ZERO);
        let slot = SimpleSlot::from_cell(&cell);
        let list = RootList::new(RootType::Global);
        assert!(list.is_empty());
        list.add(slot);
        assert!(list.contains(slot));
        assert_eq!(list.len(), 1);
        assert!(list.remove(slot));
        assert!(!list.remove(slot));
        assert!(list.is_empty());
    }

    #[test]
    fn visit_skips_null_slots() {
        let cells = [
            Atomic::new(object(0x1000).to_raw_address()),
            Atomic::new(Address::ZERO),
            Atomic::new(object(0x2000).to_raw_address()),
        ];
        let list = RootList::new(RootType::Concurrent);
        for cell in cells.iter() {
            list.add(SimpleSlot::from_cell(cell));
        }

        let mut visited = vec![];
        list.visit(&mut |root: GCRoot| visited.push((root.kind, root.object())));
        assert_eq!(
            visited,
            vec![
                (RootType::Concurrent, Some(object(0x1000))),
                (RootType::Concurrent, Some(object(0x2000))),
            ]
        );
    }

    #[test]
    fn sweep_clears_dead_and_updates_moved() {
        let dead = Atomic::new(object(0x1000).to_raw_address());
        let moved = Atomic::new(object(0x2000).to_raw_address());
        let list = RootList::new(RootType::WeakGlobal);
        list.add(SimpleSlot::from_cell(&dead));
        list.add(SimpleSlot::from_cell(&moved));

        list.sweep(&mut |o: ObjectReference| {
            if o == object(0x1000) {
                None
            } else {
                Some(object(0x3000))
            }
        });
        assert_eq!(dead.load(atomic::Ordering::Relaxed), Address::ZERO);
        assert_eq!(
            moved.load(atomic::Ordering::Relaxed),
            object(0x3000).to_raw_address()
        );
    }

    #[test]
    fn panicking_visitor_leaves_list_usable() {
        let first = Atomic::new(object(0x1000).to_raw_address());
        let second = Atomic::new(object(0x2000).to_raw_address());
        let list = RootList::new(RootType::Global);
        list.add(SimpleSlot::from_cell(&first));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            list.visit(&mut |root: GCRoot| {
                if root.object() == Some(object(0x1000)) {
                    panic!("Rejected {:?}", root.slot);
                }
            });
        }));
        assert!(result.is_err());

        list.add(SimpleSlot::from_cell(&second));
        assert_eq!(list.len(), 2);
        let mut visited = 0;
        list.visit(&mut |_root: GCRoot| visited += 1);
        assert_eq!(visited, 2);
    }

    #[test]
    fn visitor_may_remove_visited_slots() {
        let cells = [
            Atomic::new(object(0x1000).to_raw_address()),
            Atomic::new(object(0x2000).to_raw_address()),
        ];
        let list = RootList::new(RootType::Local);
        for cell in cells.iter() {
            list.add(SimpleSlot::from_cell(cell));
        }

        let mut visited = 0;
        list.visit(&mut |root: GCRoot| {
            visited += 1;
            assert!(list.remove(root.slot));
        });
        assert_eq!(visited, 2);
        assert!(list.is_empty());
    }
}
