//! Root sets kept by the collector itself.
//!
//! Besides whatever static roots the runtime reports through its [`crate::vm::RootScanner`], the
//! runtime can register root slots here at any time: global roots, roots that may be scanned
//! concurrently, weak globals, preforward roots, and per-thread roots owned by
//! [`Mutator`](crate::vm::Mutator)s.  Cross-references (XRefs) from another object model are
//! held in cells owned by [`DynamicRoots`].

mod root_list;

pub use root_list::RootList;

use std::sync::{Arc, Mutex};

use atomic::{Atomic, Ordering};

use crate::util::{Address, ObjectReference};
use crate::vm::scanning::{update_slot, visit_slot, RootType, RootUpdater, RootVisitor};
use crate::vm::slot::SimpleSlot;
use crate::vm::Mutator;

pub struct DynamicRoots {
    pub global_roots: RootList,
    pub concurrent_roots: RootList,
    pub weak_global_roots: RootList,
    pub preforward_roots: RootList,
    /// Each cell is shared so that a visit can hold it after the lock is released, and so that its
    /// slot address survives growing the vector.
    xref_cells: Mutex<Vec<Arc<Atomic<Address>>>>,
    mutators: Mutex<Vec<Arc<Mutator>>>,
}

impl Default for DynamicRoots {
    fn default() -> Self {
        Self::new()
    }
}

impl DynamicRoots {
    pub fn new() -> Self {
        DynamicRoots {
            global_roots: RootList::new(RootType::Global),
            concurrent_roots: RootList::new(RootType::Concurrent),
            weak_global_roots: RootList::new(RootType::WeakGlobal),
            preforward_roots: RootList::new(RootType::Preforward),
            xref_cells: Mutex::new(vec![]),
            mutators: Mutex::new(vec![]),
        }
    }

    /// Hold `object` alive on behalf of another object model.  An object may be added more than
    /// once; each addition is undone by one [`DynamicRoots::remove_xref`].
    pub fn add_xref(&self, object: ObjectReference) {
        self.xref_cells
            .lock()
            .unwrap()
            .push(Arc::new(Atomic::new(object.to_raw_address())));
    }

    /// Drop one cross-reference to `object`.  The cell may have been updated since it was added,
    /// so `object` is compared against the current referent.  Returns false if no cell holds it.
    pub fn remove_xref(&self, object: ObjectReference) -> bool {
        let mut cells = self.xref_cells.lock().unwrap();
        let target = object.to_raw_address();
        if let Some(index) = cells
            .iter()
            .position(|cell| cell.load(Ordering::Relaxed) == target)
        {
            cells.swap_remove(index);
            true
        } else {
            false
        }
    }

    pub fn num_xrefs(&self) -> usize {
        self.xref_cells.lock().unwrap().len()
    }

    fn xref_snapshot(&self) -> Vec<Arc<Atomic<Address>>> {
        self.xref_cells.lock().unwrap().clone()
    }

    /// Report every cross-reference as a strong root.  The visitor runs with the lock released.
    pub fn visit_xrefs<V: RootVisitor + ?Sized>(&self, visitor: &mut V) {
        for cell in self.xref_snapshot() {
            visit_slot(RootType::XRef, SimpleSlot::from_cell(&cell), visitor);
        }
    }

    pub fn update_xrefs<U: RootUpdater + ?Sized>(&self, updater: &mut U) {
        for cell in self.xref_snapshot() {
            update_slot(SimpleSlot::from_cell(&cell), updater);
        }
    }

    /// Register a mutator.  Returns false if it is already registered.
    pub fn bind_mutator(&self, mutator: Arc<Mutator>) -> bool {
        let mut mutators = self.mutators.lock().unwrap();
        if mutators.iter().any(|m| Arc::ptr_eq(m, &mutator)) {
            return false;
        }
        mutators.push(mutator);
        true
    }

    /// Unregister a mutator.  Returns false if it was not registered.
    pub fn unbind_mutator(&self, mutator: &Mutator) -> bool {
        let mut mutators = self.mutators.lock().unwrap();
        let before = mutators.len();
        mutators.retain(|m| !std::ptr::eq(m.as_ref(), mutator));
        mutators.len() != before
    }

    /// A snapshot of the registered mutators.
    pub fn mutators(&self) -> Vec<Arc<Mutator>> {
        self.mutators.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::opaque_pointer::VMThread;
    use crate::vm::scanning::GCRoot;

    fn object(raw: usize) -> ObjectReference {
        ObjectReference::from_raw_address(unsafe { Address::from_usize(raw) }).unwrap()
    }

    #[test]
    fn xref_cells() {
        let roots = DynamicRoots::new();
        roots.add_xref(object(0x1000));
        roots.add_xref(object(0x1000));
        roots.add_xref(object(0x2000));
        assert_eq!(roots.num_xrefs(), 3);

        let mut visited = vec![];
        roots.visit_xrefs(&mut |root: GCRoot| {
            assert_eq!(root.kind, RootType::XRef);
            visited.push(root.object().unwrap());
        });
        visited.sort();
        assert_eq!(visited, vec![object(0x1000), object(0x1000), object(0x2000)]);

        assert!(roots.remove_xref(object(0x1000)));
        assert!(roots.remove_xref(object(0x1000)));
        assert!(!roots.remove_xref(object(0x1000)));
        assert_eq!(roots.num_xrefs(), 1);
    }

    #[test]
    fn moved_xref_is_removed_by_its_new_address() {
        let roots = DynamicRoots::new();
        roots.add_xref(object(0x1000));
        roots.update_xrefs(&mut |_o: ObjectReference| object(0x5000));
        assert!(!roots.remove_xref(object(0x1000)));
        assert!(roots.remove_xref(object(0x5000)));
    }

    #[test]
    fn bind_unbind_mutators() {
        let roots = DynamicRoots::new();
        let mutator = Arc::new(Mutator::new(VMThread::UNINITIALIZED));
        assert!(roots.bind_mutator(mutator.clone()));
        assert!(!roots.bind_mutator(mutator.clone()));
        assert_eq!(roots.mutators().len(), 1);
        assert!(roots.unbind_mutator(&mutator));
        assert!(!roots.unbind_mutator(&mutator));
        assert!(roots.mutators().is_empty());
    }

    #[test]
    fn panicking_xref_visitor_leaves_xrefs_usable() {
        let roots = DynamicRoots::new();
        roots.add_xref(object(0x1000));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            roots.visit_xrefs(&mut |root: GCRoot| {
                if root.kind == RootType::XRef {
                    panic!("Rejected {:?}", root.slot);
                }
            });
        }));
        assert!(result.is_err());

        roots.add_xref(object(0x2000));
        assert!(roots.remove_xref(object(0x1000)));
        assert_eq!(roots.num_xrefs(), 1);
    }
}
