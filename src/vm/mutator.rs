use atomic::{Atomic, Ordering};

use crate::roots::RootList;
use crate::util::opaque_pointer::{OpaquePointer, VMPointer, VMThread};
use crate::util::Address;
use crate::vm::scanning::RootType;

/// A mutator thread, as far as root visitation is concerned.
///
/// A mutator owns three root lists.  Its roots are only visited while it is attached to a
/// language VM (see [`Mutator::vm_ptr`]).  A thread that has not attached yet, or has detached,
/// contributes no roots even if its lists are not empty.
#[derive(Debug)]
pub struct Mutator {
    thread: VMThread,
    vm: Atomic<Address>,
    /// Strong thread-local roots, such as handle scopes.
    pub local_roots: RootList,
    /// Weak thread-local roots.
    pub weak_local_roots: RootList,
    /// Thread-local roots that must be processed before objects are forwarded.
    pub preforward_roots: RootList,
}

impl Mutator {
    /// A detached mutator for `thread`.
    pub fn new(thread: VMThread) -> Self {
        Mutator {
            thread,
            vm: Atomic::new(Address::ZERO),
            local_roots: RootList::new(RootType::Local),
            weak_local_roots: RootList::new(RootType::WeakLocal),
            preforward_roots: RootList::new(RootType::Preforward),
        }
    }

    pub fn thread(&self) -> VMThread {
        self.thread
    }

    /// The VM this mutator is attached to, or `None` if it is detached.
    pub fn vm_ptr(&self) -> Option<VMPointer> {
        let vm = self.vm.load(Ordering::Acquire);
        if vm.is_zero() {
            None
        } else {
            Some(VMPointer(OpaquePointer::from_address(vm)))
        }
    }

    pub fn is_attached(&self) -> bool {
        self.vm_ptr().is_some()
    }

    /// Attach to `vm`.  `vm` must not be null.
    pub fn attach(&self, vm: VMPointer) {
        debug_assert!(!vm.is_null(), "Attaching {:?} to a null VM", self.thread);
        trace!("Attach {:?} to {:?}", self.thread, vm);
        self.vm.store(vm.0.to_address(), Ordering::Release);
    }

    pub fn detach(&self) {
        trace!("Detach {:?}", self.thread);
        self.vm.store(Address::ZERO, Ordering::Release);
    }
}
