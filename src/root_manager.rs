//! Root visitation.
//!
//! [`RootManager`] is the entry point a collector uses to enumerate roots.  It combines the root
//! sets the runtime registers at run time ([`DynamicRoots`]) with the static roots the runtime
//! reports through its [`RootScanner`], and dispatches them to visitors by phase: the
//! stop-the-world root pass, the concurrent root pass, weak root processing, preforward roots and
//! per-mutator roots.

use std::sync::Arc;

use crate::roots::DynamicRoots;
use crate::util::options::Options;
use crate::util::ObjectReference;
use crate::vm::scanning::{GCRoot, RootScanner, RootUpdater, RootVisitor, WeakRootVisitor};
use crate::vm::Mutator;

/// Wraps a strong root visitor with the checks and logging selected by [`Options`].
struct RootChecker<'a, V: RootVisitor + ?Sized> {
    options: &'a Options,
    visitor: &'a mut V,
    visited: usize,
}

impl<'a, V: RootVisitor + ?Sized> RootChecker<'a, V> {
    fn new(options: &'a Options, visitor: &'a mut V) -> Self {
        RootChecker {
            options,
            visitor,
            visited: 0,
        }
    }
}

impl<V: RootVisitor + ?Sized> RootVisitor for RootChecker<'_, V> {
    fn visit_root(&mut self, root: GCRoot) {
        if self.options.check_root_alignment {
            let raw = root.slot.load_raw();
            assert!(
                raw.is_aligned_to(ObjectReference::ALIGNMENT),
                "{} root {:?} holds misaligned reference {}",
                root.kind,
                root.slot,
                raw
            );
        }
        if self.options.verbose_root_logging {
            trace!("{} root {:?} -> {}", root.kind, root.slot, root.slot.load_raw());
        }
        self.visited += 1;
        self.visitor.visit_root(root);
    }
}

/// Visits, updates and sweeps the roots of one heap.
pub struct RootManager {
    options: Options,
    scanner: Box<dyn RootScanner>,
    dynamic_roots: DynamicRoots,
}

impl RootManager {
    /// Create a manager.  The runtime's static roots are reported by `scanner`.
    ///
    /// This also tries to initialize the built-in logger.  A logger the runtime installed first
    /// is kept.
    pub fn new(options: Options, scanner: Box<dyn RootScanner>) -> Self {
        match crate::util::logger::try_init() {
            Ok(_) => debug!("gcstate initialized the logger."),
            Err(_) => debug!(
                "gcstate failed to initialize the logger. Possibly a logger has been initialized by user."
            ),
        }
        info!(
            "gcstate {} ({}), features: {}",
            crate::build_info::GCSTATE_PKG_VERSION,
            *crate::build_info::GCSTATE_GIT_VERSION,
            crate::build_info::GCSTATE_FEATURES,
        );
        debug!("Root manager options: {:?}", options);
        RootManager {
            options,
            scanner,
            dynamic_roots: DynamicRoots::new(),
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The root sets registered at run time.  Use this to add and remove root slots.
    pub fn dynamic_roots(&self) -> &DynamicRoots {
        &self.dynamic_roots
    }

    pub fn scanner(&self) -> &dyn RootScanner {
        self.scanner.as_ref()
    }

    /// Visit every strong root: global, thread-local, concurrent and static roots.
    pub fn visit_roots<V: RootVisitor + ?Sized>(&self, visitor: &mut V) {
        let mut checker = RootChecker::new(&self.options, visitor);
        self.visit_global_roots(&mut checker);
        self.visit_local_roots(&mut checker);
        self.dynamic_roots.concurrent_roots.visit(&mut checker);
        self.scanner.visit_static_roots(&mut checker);
        debug!("Visited {} roots", checker.visited);
    }

    /// Visit the strong roots scanned while mutators are stopped.  Concurrent roots are left to
    /// [`RootManager::visit_concurrent_roots`], unless concurrent root scanning is disabled.
    pub fn visit_stw_roots<V: RootVisitor + ?Sized>(&self, visitor: &mut V) {
        let mut checker = RootChecker::new(&self.options, visitor);
        self.visit_global_roots(&mut checker);
        self.visit_local_roots(&mut checker);
        if !self.options.concurrent_root_scanning {
            self.dynamic_roots.concurrent_roots.visit(&mut checker);
        }
        self.scanner.visit_static_roots(&mut checker);
        debug!("Visited {} STW roots", checker.visited);
    }

    /// Visit the roots that may be scanned while mutators run.  Visits nothing if concurrent root
    /// scanning is disabled, as [`RootManager::visit_stw_roots`] covers them then.
    pub fn visit_concurrent_roots<V: RootVisitor + ?Sized>(&self, visitor: &mut V) {
        if !self.options.concurrent_root_scanning {
            return;
        }
        let mut checker = RootChecker::new(&self.options, visitor);
        self.dynamic_roots.concurrent_roots.visit(&mut checker);
        debug!("Visited {} concurrent roots", checker.visited);
    }

    /// Visit the static roots reported by the runtime.
    pub fn visit_base_roots<V: RootVisitor + ?Sized>(&self, visitor: &mut V) {
        let mut checker = RootChecker::new(&self.options, visitor);
        self.scanner.visit_static_roots(&mut checker);
        debug!("Visited {} base roots", checker.visited);
    }

    /// Process every weak root: weak globals, weak thread-local roots and the runtime's weak
    /// static roots.
    pub fn visit_weak_roots<W: WeakRootVisitor + ?Sized>(&self, visitor: &mut W) {
        self.dynamic_roots.weak_global_roots.sweep(visitor);
        for mutator in self.dynamic_roots.mutators() {
            self.visit_weak_mutator_root(visitor, &mutator);
        }
        self.scanner
            .sweep_static_roots(&mut |object: ObjectReference| visitor.visit_weak_root(object));
        debug!("Visited weak roots");
    }

    /// Process the weak global roots only.
    pub fn visit_weak_global_roots<W: WeakRootVisitor + ?Sized>(&self, visitor: &mut W) {
        self.dynamic_roots.weak_global_roots.sweep(visitor);
    }

    /// Visit the global and per-mutator preforward roots.
    pub fn visit_preforward_roots<V: RootVisitor + ?Sized>(&self, visitor: &mut V) {
        let mut checker = RootChecker::new(&self.options, visitor);
        self.dynamic_roots.preforward_roots.visit(&mut checker);
        for mutator in self.dynamic_roots.mutators() {
            self.visit_mutator_preforward_root(&mut checker, &mutator);
        }
        debug!("Visited {} preforward roots", checker.visited);
    }

    /// Visit the strong roots of `mutator`.  Visits nothing if it is not attached to a VM.
    pub fn visit_mutator_root<V: RootVisitor + ?Sized>(&self, visitor: &mut V, mutator: &Mutator) {
        if mutator.vm_ptr().is_some() {
            self.visit_dynamic_thread_root(visitor, mutator);
        } else {
            trace!("Skip roots of detached {:?}", mutator.thread());
        }
    }

    /// Process the weak roots of `mutator`.  Does nothing if it is not attached to a VM.
    pub fn visit_weak_mutator_root<W: WeakRootVisitor + ?Sized>(
        &self,
        visitor: &mut W,
        mutator: &Mutator,
    ) {
        if mutator.vm_ptr().is_some() {
            mutator.weak_local_roots.sweep(visitor);
        }
    }

    /// Visit the preforward roots of `mutator`.  Visits nothing if it is not attached to a VM.
    pub fn visit_mutator_preforward_root<V: RootVisitor + ?Sized>(
        &self,
        visitor: &mut V,
        mutator: &Mutator,
    ) {
        if mutator.vm_ptr().is_some() {
            mutator.preforward_roots.visit(visitor);
        }
    }

    /// Visit the strong thread-local roots of `mutator`, attached or not.
    pub fn visit_dynamic_thread_root<V: RootVisitor + ?Sized>(
        &self,
        visitor: &mut V,
        mutator: &Mutator,
    ) {
        mutator.local_roots.visit(visitor);
    }

    /// Rewrite every strong root with what `updater` returns for its referent.  Used after
    /// objects have been moved, with an updater that resolves forwarding pointers.
    pub fn update_roots<U: RootUpdater + ?Sized>(&self, updater: &mut U) {
        let roots = &self.dynamic_roots;
        roots.global_roots.update(updater);
        roots.update_xrefs(updater);
        roots.concurrent_roots.update(updater);
        roots.preforward_roots.update(updater);
        for mutator in roots.mutators() {
            if mutator.vm_ptr().is_some() {
                mutator.local_roots.update(updater);
                mutator.preforward_roots.update(updater);
            }
        }
        self.scanner
            .update_static_roots(&mut |object: ObjectReference| updater.update_root(object));
        debug!("Updated roots");
    }

    pub fn unmark_all_xrefs(&self) {
        self.scanner.unmark_all_xrefs();
    }

    pub fn sweep_unmarked_xrefs(&self) {
        self.scanner.sweep_unmarked_xrefs();
    }

    /// Hold `object` alive on behalf of another object model.
    pub fn add_xref_to_roots(&self, object: ObjectReference) {
        debug!("Add xref {}", object);
        self.scanner.add_xref_to_static_roots(object);
        self.dynamic_roots.add_xref(object);
    }

    /// Undo one [`RootManager::add_xref_to_roots`] for `object`.
    pub fn remove_xref_from_roots(&self, object: ObjectReference) {
        debug!("Remove xref {}", object);
        self.scanner.remove_xref_from_static_roots(object);
        if !self.dynamic_roots.remove_xref(object) {
            warn!("Removing xref {} which is not a root", object);
        }
    }

    /// Register a mutator so its roots are visited.
    pub fn bind_mutator(&self, mutator: Arc<Mutator>) {
        debug!("Bind {:?}", mutator.thread());
        let added = self.dynamic_roots.bind_mutator(mutator);
        debug_assert!(added, "The mutator is already bound");
    }

    pub fn unbind_mutator(&self, mutator: &Mutator) {
        debug!("Unbind {:?}", mutator.thread());
        let removed = self.dynamic_roots.unbind_mutator(mutator);
        debug_assert!(removed, "The mutator is not bound");
    }

    /// A snapshot of the bound mutators.
    pub fn mutators(&self) -> Vec<Arc<Mutator>> {
        self.dynamic_roots.mutators()
    }

    fn visit_global_roots<V: RootVisitor + ?Sized>(&self, visitor: &mut V) {
        self.dynamic_roots.global_roots.visit(visitor);
        self.dynamic_roots.visit_xrefs(visitor);
    }

    fn visit_local_roots<V: RootVisitor + ?Sized>(&self, visitor: &mut V) {
        for mutator in self.dynamic_roots.mutators() {
            self.visit_mutator_root(visitor, &mutator);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::opaque_pointer::{OpaquePointer, VMPointer, VMThread};
    use crate::util::Address;
    use crate::vm::scanning::{NoStaticRoots, RootType};
    use crate::vm::slot::SimpleSlot;
    use atomic::Atomic;

    fn object(raw: usize) -> ObjectReference {
        ObjectReference::from_raw_address(unsafe { Address::from_usize(raw) }).unwrap()
    }

    fn manager(concurrent_root_scanning: bool) -> RootManager {
        let mut options = Options::without_env();
        options.concurrent_root_scanning = concurrent_root_scanning;
        RootManager::new(options, Box::new(NoStaticRoots))
    }

    fn kinds(f: impl FnOnce(&mut dyn RootVisitor)) -> Vec<RootType> {
        let mut kinds = vec![];
        f(&mut |root: GCRoot| kinds.push(root.kind));
        kinds
    }

    #[test]
    fn concurrent_roots_follow_the_option() {
        let cell = Atomic::new(object(0x1000).to_raw_address());
        for concurrent in [true, false] {
            let manager = manager(concurrent);
            manager
                .dynamic_roots()
                .concurrent_roots
                .add(SimpleSlot::from_cell(&cell));

            let stw = kinds(|v| manager.visit_stw_roots(v));
            let conc = kinds(|v| manager.visit_concurrent_roots(v));
            let all = kinds(|v| manager.visit_roots(v));
            if concurrent {
                assert!(stw.is_empty());
                assert_eq!(conc, vec![RootType::Concurrent]);
            } else {
                assert_eq!(stw, vec![RootType::Concurrent]);
                assert!(conc.is_empty());
            }
            assert_eq!(all, vec![RootType::Concurrent]);
        }
    }

    #[test]
    fn detached_mutator_contributes_nothing() {
        let cell = Atomic::new(object(0x1000).to_raw_address());
        let manager = manager(true);
        let mutator = Arc::new(Mutator::new(VMThread::UNINITIALIZED));
        mutator.local_roots.add(SimpleSlot::from_cell(&cell));
        manager.bind_mutator(mutator.clone());

        assert!(kinds(|v| manager.visit_mutator_root(v, &mutator)).is_empty());
        assert!(kinds(|v| manager.visit_roots(v)).is_empty());
        assert_eq!(
            kinds(|v| manager.visit_dynamic_thread_root(v, &mutator)),
            vec![RootType::Local]
        );

        mutator.attach(VMPointer(OpaquePointer::from_address(unsafe {
            Address::from_usize(0x8000)
        })));
        assert_eq!(
            kinds(|v| manager.visit_mutator_root(v, &mutator)),
            vec![RootType::Local]
        );
        manager.unbind_mutator(&mutator);
        assert!(manager.mutators().is_empty());
    }

    #[test]
    fn xrefs_are_global_roots() {
        let manager = manager(true);
        manager.add_xref_to_roots(object(0x1000));
        assert_eq!(kinds(|v| manager.visit_stw_roots(v)), vec![RootType::XRef]);
        manager.update_roots(&mut |_o: ObjectReference| object(0x2000));
        manager.remove_xref_from_roots(object(0x2000));
        assert!(kinds(|v| manager.visit_roots(v)).is_empty());
    }

    #[test]
    #[should_panic(expected = "misaligned reference")]
    fn misaligned_root_is_caught() {
        let cell = Atomic::new(unsafe { Address::from_usize(0x1001) });
        let mut options = Options::without_env();
        options.check_root_alignment = true;
        let manager = RootManager::new(options, Box::new(NoStaticRoots));
        manager
            .dynamic_roots()
            .global_roots
            .add(SimpleSlot::from_cell(&cell));
        manager.visit_roots(&mut |_root: GCRoot| {});
    }

    #[test]
    fn roots_are_visitable_after_a_misaligned_root_is_caught() {
        let misaligned = Atomic::new(unsafe { Address::from_usize(0x1001) });
        let xref = object(0x3000);
        let mut options = Options::without_env();
        options.check_root_alignment = true;
        let manager = RootManager::new(options, Box::new(NoStaticRoots));
        let slot = SimpleSlot::from_cell(&misaligned);
        manager.dynamic_roots().global_roots.add(slot);
        manager.add_xref_to_roots(xref);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            manager.visit_roots(&mut |_root: GCRoot| {});
        }));
        assert!(result.is_err());

        misaligned.store(object(0x2000).to_raw_address(), atomic::Ordering::Relaxed);
        let mut visited = vec![];
        manager.visit_roots(&mut |root: GCRoot| visited.push((root.kind, root.object().unwrap())));
        visited.sort_by_key(|(_, o)| *o);
        assert_eq!(
            visited,
            vec![(RootType::Global, object(0x2000)), (RootType::XRef, xref)]
        );
        assert!(manager.dynamic_roots().global_roots.remove(slot));
    }
}
