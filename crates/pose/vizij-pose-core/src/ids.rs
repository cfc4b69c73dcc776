//! Identifiers and simple allocators for scene objects and pose sessions.

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

/// Opaque handle for a live slide/blend session owned by the engine.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SessionHandle(pub u32);

/// Address of one pose bone: owning object plus bone name.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct BoneKey {
    pub object: ObjectId,
    pub bone: String,
}

impl BoneKey {
    pub fn new(object: ObjectId, bone: impl Into<String>) -> Self {
        Self {
            object,
            bone: bone.into(),
        }
    }
}

/// Monotonic allocator for session handles.
/// Handles are never reused within one engine, so a stale handle can't alias a newer session.
#[derive(Default, Debug)]
pub struct IdAllocator {
    next_session: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc_session(&mut self) -> SessionHandle {
        let id = SessionHandle(self.next_session);
        self.next_session = self.next_session.wrapping_add(1);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_monotonic() {
        let mut alloc = IdAllocator::new();
        assert_eq!(alloc.alloc_session(), SessionHandle(0));
        assert_eq!(alloc.alloc_session(), SessionHandle(1));
    }
}
