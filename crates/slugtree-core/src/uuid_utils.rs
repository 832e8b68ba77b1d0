//! UUID v7 utilities for time-ordered identifiers.
//!
//! Job ids are UUIDv7 so that id order follows creation order, which keeps
//! listings and log correlation readable. FIFO dispatch itself relies on the
//! store's insertion sequence, not on id order.

use uuid::Uuid;

/// Generate a new UUIDv7 identifier.
///
/// # Example
///
/// ```
/// use slugtree_core::uuid_utils::{is_v7, new_v7};
///
/// let id = new_v7();
/// assert!(is_v7(&id));
/// ```
#[inline]
pub fn new_v7() -> Uuid {
    Uuid::now_v7()
}

/// Check whether a UUID is version 7.
#[inline]
pub fn is_v7(uuid: &Uuid) -> bool {
    uuid.get_version_num() == 7
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_v7_is_v7() {
        assert!(is_v7(&new_v7()));
        assert!(!is_v7(&Uuid::new_v4()));
    }

    #[test]
    fn test_v7_ids_are_unique() {
        let a = new_v7();
        let b = new_v7();
        assert_ne!(a, b);
    }
}
