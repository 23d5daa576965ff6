//! Arena configuration parameters.

use lode_core::BufferTarget;

use crate::error::ArenaError;

/// How the arena picks a new capacity when an allocation does not fit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GrowthPolicy {
    /// Double the total capacity, repeating until the request fits.
    ///
    /// A single request many times larger than the arena costs one
    /// reallocation (and one copy of the live bytes) per doubling.
    Doubling,
    /// Grow once to `max(2 * total, total + requested)`.
    ///
    /// The appended space alone satisfies the request, so one reallocation
    /// is always enough.
    #[default]
    DoublingOrFit,
}

/// Configuration for the arena allocator.
///
/// Validated at [`Arena::new`](crate::Arena::new); all values are immutable
/// after creation.
#[derive(Clone, Debug)]
pub struct ArenaConfig {
    /// Logical size of the arena at creation, in bytes.
    ///
    /// Default: 65_536. Must be non-zero.
    pub initial_capacity: usize,

    /// Growth strategy when an allocation does not fit.
    pub growth: GrowthPolicy,

    /// Upper bound on the total capacity, in bytes.
    ///
    /// `None` (the default) lets the arena grow until the storage
    /// collaborator refuses. When set, it must be at least
    /// `initial_capacity`.
    pub max_capacity: Option<usize>,

    /// Device binding point forwarded to storage creation.
    pub target: BufferTarget,

    /// Re-check every structural invariant after each mutating operation.
    ///
    /// Defaults to on in debug builds and off in release builds. The check
    /// walks the whole chain, so it turns every operation into O(n).
    pub verify_invariants: bool,
}

impl ArenaConfig {
    /// Default initial capacity: 64KB.
    pub const DEFAULT_INITIAL_CAPACITY: usize = 65_536;

    /// Create a config with the given initial capacity.
    ///
    /// Uses default values for all other parameters.
    pub fn new(initial_capacity: usize) -> Self {
        Self {
            initial_capacity,
            growth: GrowthPolicy::default(),
            max_capacity: None,
            target: BufferTarget::default(),
            verify_invariants: cfg!(debug_assertions),
        }
    }

    /// Set the growth policy.
    pub fn with_growth(mut self, growth: GrowthPolicy) -> Self {
        self.growth = growth;
        self
    }

    /// Set the capacity ceiling.
    pub fn with_max_capacity(mut self, max_capacity: usize) -> Self {
        self.max_capacity = Some(max_capacity);
        self
    }

    /// Set the device binding point.
    pub fn with_target(mut self, target: BufferTarget) -> Self {
        self.target = target;
        self
    }

    /// Enable or disable per-operation invariant checks.
    pub fn with_verify_invariants(mut self, verify: bool) -> Self {
        self.verify_invariants = verify;
        self
    }

    /// Check the parameters for consistency.
    pub fn validate(&self) -> Result<(), ArenaError> {
        if self.initial_capacity == 0 {
            return Err(ArenaError::InvalidConfig {
                reason: "initial_capacity must be non-zero".into(),
            });
        }
        if let Some(max) = self.max_capacity {
            if max < self.initial_capacity {
                return Err(ArenaError::InvalidConfig {
                    reason: format!(
                        "max_capacity ({max}) is below initial_capacity ({})",
                        self.initial_capacity,
                    ),
                });
            }
        }
        Ok(())
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INITIAL_CAPACITY)
    }
}
