//! Last-known-information snapshots.
//!
//! When an object changes zones, triggers and the event stream may need the
//! characteristics it had before the move (for example "when a resonator with
//! ATK 600 or more is destroyed"). A snapshot captures the calculated view at
//! the moment the change happens.

use crate::ids::{CardId, ObjectId, PlayerId};
use crate::types::{AttributeSet, CardType, KeywordSet, Race};
use crate::zone::Zone;

/// A snapshot of an object's calculated state at a point in time.
#[derive(Debug, Clone)]
pub struct ObjectSnapshot {
    pub object_id: ObjectId,
    pub card_id: CardId,
    pub name: String,
    pub owner: PlayerId,
    pub controller: PlayerId,
    pub card_type: CardType,
    pub attributes: AttributeSet,
    pub races: Vec<Race>,
    pub keywords: KeywordSet,
    pub atk: i32,
    pub def: i32,
    pub zone: Zone,
    pub is_token: bool,
}

impl ObjectSnapshot {
    pub fn is_combatant(&self) -> bool {
        self.card_type.is_combatant()
    }
}
