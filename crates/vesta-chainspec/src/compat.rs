//! Compatibility between a stored chain configuration and a replacement

use crate::config::{is_forked, ChainConfig};
use std::fmt;
use vesta_primitives::BlockHeight;

/// A stored configuration would rewrite history under a new configuration.
///
/// Returned, never raised: the caller decides whether to abort or rewind the
/// chain to [`CompatError::rewind_to`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatError {
    /// Which fork disagrees
    pub what: &'static str,
    /// Activation height in the stored configuration
    pub stored: Option<BlockHeight>,
    /// Activation height in the new configuration
    pub new: Option<BlockHeight>,
    /// Height the local chain must be rewound to
    pub rewind_to: BlockHeight,
}

impl CompatError {
    fn new(what: &'static str, stored: Option<BlockHeight>, new: Option<BlockHeight>) -> Self {
        let rewind_point = match (stored, new) {
            (None, new) => new,
            (Some(s), None) => Some(s),
            (Some(s), Some(n)) if s < n => Some(s),
            (Some(_), new) => new,
        };
        let rewind_to = match rewind_point {
            Some(block) if block > 0 => block - 1,
            _ => 0,
        };
        Self { what, stored, new, rewind_to }
    }
}

impl fmt::Display for CompatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |block: Option<BlockHeight>| block.map_or_else(|| "nil".to_string(), |b| b.to_string());
        write!(
            f,
            "mismatching {} in database (have {}, want {}, rewindto {})",
            self.what,
            show(self.stored),
            show(self.new),
            self.rewind_to
        )
    }
}

impl std::error::Error for CompatError {}

/// A fork scheduled at `stored` cannot move to `new` once `head` has passed
/// either of them.
fn is_fork_incompatible(
    stored: Option<BlockHeight>,
    new: Option<BlockHeight>,
    head: BlockHeight,
) -> bool {
    (is_forked(stored, head) || is_forked(new, head)) && stored != new
}

impl ChainConfig {
    /// Check whether switching from `self` (stored) to `new` at `height`
    /// alters already-imported blocks.
    ///
    /// Returns the conflict with the lowest rewind height: the check is
    /// repeated at the previous conflict's rewind target until it stops
    /// moving.
    pub fn check_compatible(&self, new: &ChainConfig, height: BlockHeight) -> Option<CompatError> {
        let mut head = height;
        let mut last: Option<CompatError> = None;

        // rewind_to < head whenever a conflict exists at head > 0, so the
        // candidate height strictly decreases until the loop exits.
        while let Some(err) = self.check_compatible_at(new, head) {
            if last.as_ref().is_some_and(|prev| prev.rewind_to == err.rewind_to) {
                break;
            }
            head = err.rewind_to;
            last = Some(err);
        }

        if let Some(err) = &last {
            tracing::debug!("Incompatible chain config: {}", err);
        }
        last
    }

    fn check_compatible_at(&self, new: &ChainConfig, head: BlockHeight) -> Option<CompatError> {
        let forks = [
            ("Homestead fork block", self.homestead_block, new.homestead_block),
            ("EIP150 fork block", self.eip150_block, new.eip150_block),
            ("London fork block", self.london_block, new.london_block),
        ];
        forks
            .into_iter()
            .find(|&(_, stored, new)| is_fork_incompatible(stored, new, head))
            .map(|(what, stored, new)| CompatError::new(what, stored, new))
    }
}
