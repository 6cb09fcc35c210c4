//! Target specifications and chosen targets.

use crate::filter::{ObjectFilter, PlayerFilter};
use crate::ids::{ObjectId, PlayerId};

/// A chosen target: an object or a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Object(ObjectId),
    Player(PlayerId),
}

/// What a spell or ability may target.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetKind {
    /// Objects matching a filter.
    Objects(ObjectFilter),
    /// A player matching a filter.
    Players(PlayerFilter),
    /// Either an object matching the filter or a player matching the filter.
    ObjectsOrPlayers(ObjectFilter, PlayerFilter),
}

/// A target requirement: what may be chosen and how many.
///
/// The same spec is used for selection and for resolution-time re-validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChooseSpec {
    pub kind: TargetKind,
    /// Minimum required. Zero means the target clause is "up to".
    pub min: usize,
    pub max: usize,
}

impl ChooseSpec {
    pub fn object(filter: ObjectFilter) -> Self {
        Self {
            kind: TargetKind::Objects(filter),
            min: 1,
            max: 1,
        }
    }

    pub fn objects(filter: ObjectFilter, min: usize, max: usize) -> Self {
        Self {
            kind: TargetKind::Objects(filter),
            min,
            max,
        }
    }

    pub fn player(filter: PlayerFilter) -> Self {
        Self {
            kind: TargetKind::Players(filter),
            min: 1,
            max: 1,
        }
    }

    pub fn object_or_player(object_filter: ObjectFilter, player_filter: PlayerFilter) -> Self {
        Self {
            kind: TargetKind::ObjectsOrPlayers(object_filter, player_filter),
            min: 1,
            max: 1,
        }
    }

    pub fn up_to(mut self, max: usize) -> Self {
        self.min = 0;
        self.max = max;
        self
    }

    /// Whether the number of chosen targets satisfies the count contract.
    pub fn count_is_valid(&self, chosen: usize) -> bool {
        chosen >= self.min && chosen <= self.max
    }
}
