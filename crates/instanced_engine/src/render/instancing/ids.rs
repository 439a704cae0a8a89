//! Resource and instance identifiers
//!
//! Ids are issued by an [`IdSource`], an explicit counter object injected into
//! each repository. Sharing one source between repositories keeps ids unique
//! across all of them.

use crate::render::instancing::{InstancingError, InstancingResult};
use std::fmt;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

/// Handle naming a registered mesh resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId(NonZeroU64);

impl ResourceId {
    /// Raw counter value
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resource#{}", self.0)
    }
}

/// Handle naming one instance of a mesh resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceId(NonZeroU64);

impl InstanceId {
    /// Raw counter value
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instance#{}", self.0)
    }
}

/// Monotonic counter that never issues zero
#[derive(Debug)]
pub struct IdCounter {
    next: AtomicU64,
}

impl IdCounter {
    /// Counter whose first issued value is 1
    pub const fn new() -> Self {
        Self::starting_at(1)
    }

    /// Counter whose first issued value is `first`
    ///
    /// A counter started at 0 is already exhausted.
    pub const fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Value the next call to [`IdCounter::issue`] would return
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }

    /// Issue the next value; `None` once the counter has wrapped
    pub fn issue(&self) -> Option<NonZeroU64> {
        let issued = self
            .next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                // 0 marks exhaustion and stays sticky
                if current == 0 {
                    None
                } else {
                    Some(current.wrapping_add(1))
                }
            })
            .ok()?;
        NonZeroU64::new(issued)
    }
}

impl Default for IdCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Pair of counters issuing resource and instance ids
#[derive(Debug, Default)]
pub struct IdSource {
    resources: IdCounter,
    instances: IdCounter,
}

impl IdSource {
    /// Fresh source; both counters start at 1
    pub const fn new() -> Self {
        Self {
            resources: IdCounter::new(),
            instances: IdCounter::new(),
        }
    }

    /// Source with explicit starting points, mainly for tests
    pub const fn starting_at(first_resource: u64, first_instance: u64) -> Self {
        Self {
            resources: IdCounter::starting_at(first_resource),
            instances: IdCounter::starting_at(first_instance),
        }
    }

    /// Issue a resource id
    pub fn next_resource(&self) -> InstancingResult<ResourceId> {
        self.resources
            .issue()
            .map(ResourceId)
            .ok_or(InstancingError::IdentifierSpaceExhausted { kind: "resource" })
    }

    /// Issue an instance id
    pub fn next_instance(&self) -> InstancingResult<InstanceId> {
        self.instances
            .issue()
            .map(InstanceId)
            .ok_or(InstancingError::IdentifierSpaceExhausted { kind: "instance" })
    }

    /// Raw value of the next resource id
    pub fn peek_resource(&self) -> u64 {
        self.resources.peek()
    }

    /// Raw value of the next instance id
    pub fn peek_instance(&self) -> u64 {
        self.instances.peek()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let source = IdSource::new();

        let first = source.next_resource().expect("resource id");
        let second = source.next_resource().expect("resource id");
        assert_eq!(first.get(), 1);
        assert_eq!(second.get(), 2);

        // Instance ids use their own counter
        assert_eq!(source.next_instance().expect("instance id").get(), 1);
        assert_eq!(source.peek_resource(), 3);
        assert_eq!(source.peek_instance(), 2);
    }

    #[test]
    fn test_wraparound_is_exhaustion() {
        let source = IdSource::starting_at(u64::MAX, 1);

        let last = source.next_resource().expect("last id");
        assert_eq!(last.get(), u64::MAX);

        for _ in 0..2 {
            assert!(matches!(
                source.next_resource(),
                Err(InstancingError::IdentifierSpaceExhausted { kind: "resource" })
            ));
        }
    }

    #[test]
    fn test_counter_started_at_zero_is_exhausted() {
        let counter = IdCounter::starting_at(0);
        assert!(counter.issue().is_none());
    }

    #[test]
    fn test_display_names_kind() {
        let source = IdSource::new();
        let resource = source.next_resource().expect("resource id");
        let instance = source.next_instance().expect("instance id");
        assert_eq!(resource.to_string(), "resource#1");
        assert_eq!(instance.to_string(), "instance#1");
    }
}
