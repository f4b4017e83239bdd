//! Static-root hooks.
//!
//! A runtime that reports its static roots through plain functions registers them here, one
//! function per operation of [`RootScanner`], and hands the resulting [`StaticRootHooks`] to
//! [`crate::RootManager::new`].  Each hook is registered once, during start-up, before the
//! scanner is given to a manager.  Calling an operation whose hook was never registered is a
//! fatal error.

use crate::util::ObjectReference;
use crate::vm::scanning::{RootScanner, RootUpdater, RootVisitor, WeakRootVisitor};

pub type VisitStaticRootsHook = fn(&mut dyn RootVisitor);
pub type UpdateStaticRootsHook = fn(&mut dyn RootUpdater);
pub type SweepStaticRootsHook = fn(&mut dyn WeakRootVisitor);
pub type UnmarkAllXRefsHook = fn();
pub type SweepUnmarkedXRefsHook = fn();
pub type AddXRefToStaticRootsHook = fn(ObjectReference);
pub type RemoveXRefFromStaticRootsHook = fn(ObjectReference);

/// A [`RootScanner`] assembled from function hooks.
#[derive(Default, Clone)]
pub struct StaticRootHooks {
    visit_static_roots: Option<VisitStaticRootsHook>,
    update_static_roots: Option<UpdateStaticRootsHook>,
    sweep_static_roots: Option<SweepStaticRootsHook>,
    unmark_all_xrefs: Option<UnmarkAllXRefsHook>,
    sweep_unmarked_xrefs: Option<SweepUnmarkedXRefsHook>,
    add_xref_to_static_roots: Option<AddXRefToStaticRootsHook>,
    remove_xref_from_static_roots: Option<RemoveXRefFromStaticRootsHook>,
}

macro_rules! register_hooks {
    ($($register:ident => $name:ident: $hook_type:ty),* $(,)?) => {
        impl StaticRootHooks {
            $(
                #[doc = concat!("Register the `", stringify!($name), "` hook.  A hook may be registered only once.")]
                pub fn $register(&mut self, hook: $hook_type) -> &mut Self {
                    debug_assert!(
                        self.$name.is_none(),
                        "The {} hook is already registered",
                        stringify!($name)
                    );
                    debug!("Register the {} hook", stringify!($name));
                    self.$name = Some(hook);
                    self
                }
            )*
        }
    };
}

register_hooks! {
    register_visit_static_roots_hook => visit_static_roots: VisitStaticRootsHook,
    register_update_static_roots_hook => update_static_roots: UpdateStaticRootsHook,
    register_sweep_static_roots_hook => sweep_static_roots: SweepStaticRootsHook,
    register_unmark_all_xrefs_hook => unmark_all_xrefs: UnmarkAllXRefsHook,
    register_sweep_unmarked_xrefs_hook => sweep_unmarked_xrefs: SweepUnmarkedXRefsHook,
    register_add_xref_to_static_roots_hook => add_xref_to_static_roots: AddXRefToStaticRootsHook,
    register_remove_xref_from_static_roots_hook => remove_xref_from_static_roots: RemoveXRefFromStaticRootsHook,
}

/// Get a registered hook, or panic naming the missing one.
fn registered<H: Copy>(hook: &Option<H>, name: &str) -> H {
    match hook {
        Some(hook) => *hook,
        None => panic!("The {} hook is called but has not been registered", name),
    }
}

impl StaticRootHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if every hook is registered.
    pub fn is_complete(&self) -> bool {
        self.visit_static_roots.is_some()
            && self.update_static_roots.is_some()
            && self.sweep_static_roots.is_some()
            && self.unmark_all_xrefs.is_some()
            && self.sweep_unmarked_xrefs.is_some()
            && self.add_xref_to_static_roots.is_some()
            && self.remove_xref_from_static_roots.is_some()
    }
}

impl std::fmt::Debug for StaticRootHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticRootHooks")
            .field("visit_static_roots", &self.visit_static_roots.is_some())
            .field("update_static_roots", &self.update_static_roots.is_some())
            .field("sweep_static_roots", &self.sweep_static_roots.is_some())
            .field("unmark_all_xrefs", &self.unmark_all_xrefs.is_some())
            .field("sweep_unmarked_xrefs", &self.sweep_unmarked_xrefs.is_some())
            .field("add_xref_to_static_roots", &self.add_xref_to_static_roots.is_some())
            .field(
                "remove_xref_from_static_roots",
                &self.remove_xref_from_static_roots.is_some(),
            )
            .finish()
    }
}

impl RootScanner for StaticRootHooks {
    fn visit_static_roots(&self, visitor: &mut dyn RootVisitor) {
        registered(&self.visit_static_roots, "visit_static_roots")(visitor)
    }

    fn update_static_roots(&self, updater: &mut dyn RootUpdater) {
        registered(&self.update_static_roots, "update_static_roots")(updater)
    }

    fn sweep_static_roots(&self, visitor: &mut dyn WeakRootVisitor) {
        registered(&self.sweep_static_roots, "sweep_static_roots")(visitor)
    }

    fn unmark_all_xrefs(&self) {
        registered(&self.unmark_all_xrefs, "unmark_all_xrefs")()
    }

    fn sweep_unmarked_xrefs(&self) {
        registered(&self.sweep_unmarked_xrefs, "sweep_unmarked_xrefs")()
    }

    fn add_xref_to_static_roots(&self, object: ObjectReference) {
        registered(&self.add_xref_to_static_roots, "add_xref_to_static_roots")(object)
    }

    fn remove_xref_from_static_roots(&self, object: ObjectReference) {
        registered(
            &self.remove_xref_from_static_roots,
            "remove_xref_from_static_roots",
        )(object)
    }
}
