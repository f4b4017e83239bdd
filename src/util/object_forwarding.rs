//! The evacuation protocol on top of [`StateWord`].
//!
//! A GC worker that wants to move an object calls [`attempt_to_forward`].  If it wins the object,
//! it copies it and calls [`forward_object`] (or [`abandon_forwarding`] if it decides not to move
//! it after all).  A worker that loses calls [`spin_and_get_forwarded_object`] to wait for the
//! winner to publish the new location.

use crossbeam::utils::Backoff;

use crate::util::object_state::ObjectState;
use crate::util::state_word::{BaseObject, StateWord};
use crate::util::ObjectReference;

/// The result of [`attempt_to_forward`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ForwardingAttempt {
    /// This thread locked the object.  Holds the state before locking, which
    /// [`abandon_forwarding`] restores.
    Claimed(ObjectState),
    /// Another thread holds the lock.  Holds the last observed state.
    BeingForwarded(ObjectState),
    /// The object has already been forwarded.
    AlreadyForwarded,
    /// The object is in a state that is never forwarded, such as `ToVersion`.  Holds that state.
    NotForwardable(ObjectState),
}

/// Attempt to become the thread that forwards the object.
pub fn attempt_to_forward(state_word: &StateWord) -> ForwardingAttempt {
    loop {
        let current = state_word.atomic_get_object_state();
        if current.is_forwarded_state() {
            return ForwardingAttempt::AlreadyForwarded;
        }
        if current.is_locked_state() {
            return ForwardingAttempt::BeingForwarded(current);
        }
        if !current.is_forwardable_state() {
            return ForwardingAttempt::NotForwardable(current);
        }
        if state_word.try_lock_state_word(current) {
            return ForwardingAttempt::Claimed(current);
        }
        // The state changed under us (another thread locked it, or a spurious failure).
        // Look again.
    }
}

/// Copy the object with `copy` and publish the copy as the forwarding pointer.  The caller must
/// have claimed the object with [`attempt_to_forward`].
///
/// Returns the reference to the new object.
pub fn forward_object<F>(state_word: &StateWord, copy: F) -> ObjectReference
where
    F: FnOnce() -> ObjectReference,
{
    debug_assert!(
        state_word.is_locked_state(),
        "forward_object called on {:?}, which was not claimed",
        state_word
    );
    let new_object = copy();
    state_word.set_forwarding_pointer_exclusive(new_object);
    new_object
}

/// Give up a claimed object without moving it, restoring the state it had before it was claimed.
pub fn abandon_forwarding(state_word: &StateWord, previous: ObjectState) {
    trace!("abandon_forwarding({:?}, {:?})", state_word, previous);
    state_word.unlock_state_word(previous);
}

/// Spin-wait for another thread's forwarding of `object` to complete, then read the forwarding
/// pointer to the new object.
///
/// Returns `object` itself if the thread holding the lock abandoned the forwarding.
pub fn spin_and_get_forwarded_object(
    object: ObjectReference,
    state_word: &StateWord,
) -> ObjectReference {
    let backoff = Backoff::new();
    let mut state = state_word.atomic_get_object_state();
    while state.is_locked_state() {
        backoff.snooze();
        state = state_word.atomic_get_object_state();
    }

    if state.is_forwarded_state() {
        state_word.get_forwarding_pointer()
    } else {
        debug_assert!(
            state.has_valid_state_code(),
            "Invalid/Corrupted state word {:?} for object {}",
            state_word,
            object,
        );
        object
    }
}

/// Get the forwarded copy of `object`, if it has been forwarded.
///
/// # Safety
/// `object` must point to a live [`BaseObject`].
pub unsafe fn get_forwarded_object(object: ObjectReference) -> Option<ObjectReference> {
    let state_word = BaseObject::from_object(object).state_word();
    if state_word.is_forwarded_state() {
        Some(state_word.get_forwarding_pointer())
    } else {
        None
    }
}

/// Return the forwarded copy of `object`, or `object` if it has not moved.  Waits if the object
/// is being forwarded by another thread.
///
/// # Safety
/// `object` must point to a live [`BaseObject`].
pub unsafe fn resolve_object(object: ObjectReference) -> ObjectReference {
    let state_word = BaseObject::from_object(object).state_word();
    spin_and_get_forwarded_object(object, state_word)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::object_state::ObjectStateCode;
    use crate::util::test_util::panic_after;
    use crate::util::Address;
    use std::sync::Arc;

    fn object(raw: usize) -> ObjectReference {
        ObjectReference::from_raw_address(unsafe { Address::from_usize(raw) }).unwrap()
    }

    #[test]
    fn claim_then_forward() {
        let word = StateWord::with_type_info(unsafe { Address::from_usize(0x1000) });
        let attempt = attempt_to_forward(&word);
        assert!(matches!(attempt, ForwardingAttempt::Claimed(_)));
        assert!(matches!(
            attempt_to_forward(&word),
            ForwardingAttempt::BeingForwarded(_)
        ));
        let new_object = forward_object(&word, || object(0x8000));
        assert_eq!(new_object, object(0x8000));
        assert_eq!(attempt_to_forward(&word), ForwardingAttempt::AlreadyForwarded);
        assert_eq!(
            spin_and_get_forwarded_object(object(0x4000), &word),
            object(0x8000)
        );
    }

    #[test]
    fn to_version_object_is_not_claimed() {
        let word = StateWord::with_type_info(unsafe { Address::from_usize(0x1000) });
        word.set_state_code(ObjectStateCode::ToVersion);
        let attempt = attempt_to_forward(&word);
        assert_eq!(
            attempt,
            ForwardingAttempt::NotForwardable(ObjectState::new(ObjectStateCode::ToVersion))
        );
        assert_eq!(word.get_state_code(), ObjectStateCode::ToVersion);
        assert_eq!(word.get_type_info(), unsafe { Address::from_usize(0x1000) });
    }

    #[test]
    fn abandon_restores_previous_state() {
        let word = StateWord::with_type_info(unsafe { Address::from_usize(0x1000) });
        let ForwardingAttempt::Claimed(previous) = attempt_to_forward(&word) else {
            panic!("fresh object should be claimable");
        };
        abandon_forwarding(&word, previous);
        assert_eq!(word.get_state_code(), ObjectStateCode::Initial);
        assert_eq!(
            spin_and_get_forwarded_object(object(0x4000), &word),
            object(0x4000)
        );
    }

    #[test]
    fn waiter_sees_pointer_published_by_another_thread() {
        panic_after(5000, || {
            let header = Arc::new(BaseObject::with_type_info(unsafe {
                Address::from_usize(0x1000)
            }));
            let ForwardingAttempt::Claimed(_) = attempt_to_forward(header.state_word()) else {
                panic!("fresh object should be claimable");
            };
            let waiter = {
                let header = header.clone();
                std::thread::spawn(move || {
                    let object = header.object_reference();
                    spin_and_get_forwarded_object(object, header.state_word())
                })
            };
            std::thread::sleep(std::time::Duration::from_millis(10));
            forward_object(header.state_word(), || object(0x9000));
            assert_eq!(waiter.join().unwrap(), object(0x9000));
        });
    }

    #[test]
    fn resolve_through_header() {
        let header = BaseObject::with_type_info(unsafe { Address::from_usize(0x1000) });
        let object_ref = header.object_reference();
        assert_eq!(unsafe { get_forwarded_object(object_ref) }, None);
        let ForwardingAttempt::Claimed(_) = attempt_to_forward(header.state_word()) else {
            panic!("fresh object should be claimable");
        };
        forward_object(header.state_word(), || object(0xa000));
        assert_eq!(unsafe { get_forwarded_object(object_ref) }, Some(object(0xa000)));
        assert_eq!(unsafe { resolve_object(object_ref) }, object(0xa000));
    }
}
