//! Process-wide identifier allocator.
//!
//! One monotonic counter serves both call correlation ids and the names
//! assigned to workers that connect without one, so a generated name can
//! never collide with a later one.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate the next identifier, rendered as a decimal string.
pub fn next_id() -> String {
    NEXT_ID.fetch_add(1, Ordering::Relaxed).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_monotonic() {
        let a: u64 = next_id().parse().unwrap();
        let b: u64 = next_id().parse().unwrap();
        let c: u64 = next_id().parse().unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_ids_are_decimal() {
        let id = next_id();
        assert!(id.chars().all(|c| c.is_ascii_digit()));
    }
}
