use strum_macros::{Display, EnumIter};

use crate::util::ObjectReference;
use crate::vm::slot::SimpleSlot;

/// Where a root was found.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum RootType {
    /// A global root registered with [`crate::roots::DynamicRoots`].
    Global,
    /// A root owned by a mutator thread.
    Local,
    /// A root that may be scanned while mutators run.
    Concurrent,
    /// A weak global root.
    WeakGlobal,
    /// A weak root owned by a mutator thread.
    WeakLocal,
    /// A root that must be processed before objects are forwarded.
    Preforward,
    /// A root reported by the embedding runtime's [`RootScanner`].
    Static,
    /// A cross-reference from another object model, held alive by the collector.
    XRef,
}

/// A strong root: the slot that holds the reference, and where it was found.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GCRoot {
    pub kind: RootType,
    pub slot: SimpleSlot,
}

impl GCRoot {
    pub fn new(kind: RootType, slot: SimpleSlot) -> Self {
        GCRoot { kind, slot }
    }

    /// The referent.  `None` if the slot was cleared after the root was reported.
    pub fn object(&self) -> Option<ObjectReference> {
        self.slot.load()
    }
}

/// Callback trait of root visiting functions.  Called once for each non-null strong root.
/// The visitor may update the slot, for example after moving the referent.
pub trait RootVisitor {
    fn visit_root(&mut self, root: GCRoot);
}

/// This lets us use closures as RootVisitor.
impl<F: FnMut(GCRoot)> RootVisitor for F {
    fn visit_root(&mut self, root: GCRoot) {
        self(root)
    }
}

/// Callback trait of weak root visiting functions.
///
/// The visitor is given the referent of each non-null weak root.  It returns `None` if the
/// referent is dead, in which case the slot is cleared, or `Some(object)` with the (possibly
/// moved) referent, which is written back if it differs.
pub trait WeakRootVisitor {
    fn visit_weak_root(&mut self, object: ObjectReference) -> Option<ObjectReference>;
}

/// This lets us use closures as WeakRootVisitor.
impl<F: FnMut(ObjectReference) -> Option<ObjectReference>> WeakRootVisitor for F {
    fn visit_weak_root(&mut self, object: ObjectReference) -> Option<ObjectReference> {
        self(object)
    }
}

/// Callback trait of root updating functions.  Given the referent of a strong root, return the
/// reference the slot should hold, such as the forwarded copy.
pub trait RootUpdater {
    fn update_root(&mut self, object: ObjectReference) -> ObjectReference;
}

/// This lets us use closures as RootUpdater.
impl<F: FnMut(ObjectReference) -> ObjectReference> RootUpdater for F {
    fn update_root(&mut self, object: ObjectReference) -> ObjectReference {
        self(object)
    }
}

/// Report `slot` to `visitor` if it holds a reference.
#[inline]
pub fn visit_slot<V: RootVisitor + ?Sized>(kind: RootType, slot: SimpleSlot, visitor: &mut V) {
    if !slot.load_raw().is_zero() {
        visitor.visit_root(GCRoot::new(kind, slot));
    }
}

/// Apply weak-root semantics to `slot`: clear it if the referent is dead, update it if the
/// referent moved.  Returns true if the slot still holds a reference afterwards.
#[inline]
pub fn process_weak_slot<W: WeakRootVisitor + ?Sized>(slot: SimpleSlot, visitor: &mut W) -> bool {
    let Some(object) = slot.load() else {
        return false;
    };
    match visitor.visit_weak_root(object) {
        Some(new_object) => {
            if new_object != object {
                slot.store(new_object);
            }
            true
        }
        None => {
            trace!("Clear weak root {:?} to dead object {}", slot, object);
            slot.clear();
            false
        }
    }
}

/// Rewrite `slot` with what `updater` returns for its referent.  Returns true if the slot changed.
#[inline]
pub fn update_slot<U: RootUpdater + ?Sized>(slot: SimpleSlot, updater: &mut U) -> bool {
    let Some(object) = slot.load() else {
        return false;
    };
    let new_object = updater.update_root(object);
    if new_object != object {
        trace!("Update root {:?}: {} -> {}", slot, object, new_object);
        slot.store(new_object);
        true
    } else {
        false
    }
}

/// Static roots and cross-reference bookkeeping supplied by the embedding runtime.
///
/// The collector does not know the runtime's object model.  Whatever roots the runtime keeps
/// outside the collector's own root sets (class tables, interned strings, module globals, and
/// references held by another object model) are reported through this trait.  An instance is
/// given to [`crate::RootManager::new`], so a manager never exists without one.
pub trait RootScanner: Send + Sync {
    /// Report every static root to `visitor`.
    fn visit_static_roots(&self, visitor: &mut dyn RootVisitor);

    /// Rewrite every static root with what `updater` returns, after objects have moved.
    fn update_static_roots(&self, updater: &mut dyn RootUpdater);

    /// Apply weak semantics to the static roots that do not keep their referents alive.
    fn sweep_static_roots(&self, visitor: &mut dyn WeakRootVisitor);

    /// Clear the mark of every cross-reference before marking.
    fn unmark_all_xrefs(&self);

    /// Drop every cross-reference that was not marked.
    fn sweep_unmarked_xrefs(&self);

    /// Record that `object` is referenced from another object model.
    fn add_xref_to_static_roots(&self, object: ObjectReference);

    /// Forget a cross-reference recorded by `add_xref_to_static_roots`.
    fn remove_xref_from_static_roots(&self, object: ObjectReference);
}

/// A [`RootScanner`] for runtimes that have no static roots and no cross-references.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoStaticRoots;

impl RootScanner for NoStaticRoots {
    fn visit_static_roots(&self, _visitor: &mut dyn RootVisitor) {}
    fn update_static_roots(&self, _updater: &mut dyn RootUpdater) {}
    fn sweep_static_roots(&self, _visitor: &mut dyn WeakRootVisitor) {}
    fn unmark_all_xrefs(&self) {}
    fn sweep_unmarked_xrefs(&self) {}
    fn add_xref_to_static_roots(&self, _object: ObjectReference) {}
    fn remove_xref_from_static_roots(&self, _object: ObjectReference) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::Address;
    use atomic::Atomic;

    fn object(raw: usize) -> ObjectReference {
        ObjectReference::from_raw_address(unsafe { Address::from_usize(raw) }).unwrap()
    }

    #[test]
    fn null_slots_are_not_visited() {
        let cell = Atomic::new(Address::ZERO);
        let mut count = 0;
        visit_slot(RootType::Global, SimpleSlot::from_cell(&cell), &mut |_root: GCRoot| {
            count += 1
        });
        assert_eq!(count, 0);
    }

    #[test]
    fn weak_slot_is_cleared_when_dead() {
        let cell = Atomic::new(object(0x1000).to_raw_address());
        let slot = SimpleSlot::from_cell(&cell);
        assert!(!process_weak_slot(slot, &mut |_object: ObjectReference| -> Option<ObjectReference> { None }));
        assert_eq!(slot.load(), None);
    }

    #[test]
    fn weak_slot_is_updated_when_moved() {
        let cell = Atomic::new(object(0x1000).to_raw_address());
        let slot = SimpleSlot::from_cell(&cell);
        assert!(process_weak_slot(slot, &mut |_object: ObjectReference| Some(object(0x2000))));
        assert_eq!(slot.load(), Some(object(0x2000)));
    }

    #[test]
    fn update_slot_reports_changes() {
        let cell = Atomic::new(object(0x1000).to_raw_address());
        let slot = SimpleSlot::from_cell(&cell);
        assert!(!update_slot(slot, &mut |o: ObjectReference| o));
        assert!(update_slot(slot, &mut |_o: ObjectReference| object(0x3000)));
        assert_eq!(slot.load(), Some(object(0x3000)));
    }

    #[test]
    fn root_type_display() {
        use strum::IntoEnumIterator;
        assert_eq!(RootType::WeakGlobal.to_string(), "WeakGlobal");
        let names: std::collections::HashSet<String> =
            RootType::iter().map(|kind| kind.to_string()).collect();
        assert_eq!(names.len(), RootType::iter().count());
    }
}
