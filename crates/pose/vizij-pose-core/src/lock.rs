//! Evaluation locks: at most one session writes a given object's pose.
//!
//! The engine owns one [`EvalLocks`] registry; sessions hold an
//! [`EvalLockGuard`] per object. Dropping the guard unlocks the object, whether
//! the session finished normally, was dropped, or unwound.

use std::cell::RefCell;
use std::rc::Rc;

use hashbrown::HashSet;
use log::debug;

use crate::error::PoseError;
use crate::ids::ObjectId;

#[derive(Clone, Debug, Default)]
pub struct EvalLocks {
    held: Rc<RefCell<HashSet<ObjectId>>>,
}

impl EvalLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock `object`, or fail with `ObjectBusy` when another guard holds it.
    pub fn try_lock(&self, object: ObjectId, name: &str) -> Result<EvalLockGuard, PoseError> {
        if !self.held.borrow_mut().insert(object) {
            return Err(PoseError::ObjectBusy {
                object: name.to_string(),
            });
        }
        debug!("evaluation locked for '{name}'");
        Ok(EvalLockGuard {
            locks: self.clone(),
            object,
        })
    }

    pub fn is_locked(&self, object: ObjectId) -> bool {
        self.held.borrow().contains(&object)
    }

    pub fn locked_count(&self) -> usize {
        self.held.borrow().len()
    }
}

#[derive(Debug)]
pub struct EvalLockGuard {
    locks: EvalLocks,
    object: ObjectId,
}

impl EvalLockGuard {
    pub fn object(&self) -> ObjectId {
        self.object
    }
}

impl Drop for EvalLockGuard {
    fn drop(&mut self) {
        self.locks.held.borrow_mut().remove(&self.object);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_lock_is_rejected_until_guard_drops() {
        let locks = EvalLocks::new();
        let guard = locks.try_lock(ObjectId(3), "Rig").unwrap();
        assert!(locks.is_locked(ObjectId(3)));
        assert_eq!(
            locks.try_lock(ObjectId(3), "Rig").unwrap_err(),
            PoseError::ObjectBusy {
                object: "Rig".into()
            }
        );
        drop(guard);
        assert!(!locks.is_locked(ObjectId(3)));
        assert!(locks.try_lock(ObjectId(3), "Rig").is_ok());
    }
}
