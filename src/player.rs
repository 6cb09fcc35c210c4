//! Player state: life, zones, ruler, and per-turn flags.

use crate::ids::{ObjectId, PlayerId};
use crate::will::WillPool;
use crate::zone::Zone;

#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,

    // Life and resources
    pub life: i32,
    pub will_pool: WillPool,

    // Per-turn tracking
    pub has_called_stone: bool,
    /// Recovery is skipped on each player's first turn.
    pub has_had_recovery: bool,

    // Hand size
    pub max_hand_size: i32,

    // Game status
    pub has_lost: bool,
    pub has_won: bool,
    /// Judgment is once per game.
    pub has_performed_judgment: bool,

    // Zones (stored as object IDs; the field is indexed globally on GameState)
    pub main_deck: Vec<ObjectId>,
    pub stone_deck: Vec<ObjectId>,
    pub hand: Vec<ObjectId>,
    pub graveyard: Vec<ObjectId>,
    pub removed: Vec<ObjectId>,
    pub standby: Vec<ObjectId>,
    /// The ruler (or J-Ruler, when flipped and returned) slot.
    pub ruler: Option<ObjectId>,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>, starting_life: i32) -> Self {
        Self {
            id,
            name: name.into(),
            life: starting_life,
            will_pool: WillPool::new(),
            has_called_stone: false,
            has_had_recovery: false,
            max_hand_size: 7,
            has_lost: false,
            has_won: false,
            has_performed_judgment: false,
            main_deck: Vec::new(),
            stone_deck: Vec::new(),
            hand: Vec::new(),
            graveyard: Vec::new(),
            removed: Vec::new(),
            standby: Vec::new(),
            ruler: None,
        }
    }

    pub fn is_in_game(&self) -> bool {
        !self.has_lost
    }

    pub fn has_lethal_life(&self) -> bool {
        self.life <= 0
    }

    /// The per-player vector that backs the given zone, if any.
    ///
    /// `Field`, `Chase`, and `RulerArea` are not list-backed here: the field
    /// and the Chase are indexed on the game state, the ruler has its own slot.
    pub fn zone_list(&self, zone: Zone) -> Option<&Vec<ObjectId>> {
        match zone {
            Zone::MainDeck => Some(&self.main_deck),
            Zone::StoneDeck => Some(&self.stone_deck),
            Zone::Hand => Some(&self.hand),
            Zone::Graveyard => Some(&self.graveyard),
            Zone::Removed => Some(&self.removed),
            Zone::Standby => Some(&self.standby),
            Zone::Field | Zone::Chase | Zone::RulerArea => None,
        }
    }

    pub fn zone_list_mut(&mut self, zone: Zone) -> Option<&mut Vec<ObjectId>> {
        match zone {
            Zone::MainDeck => Some(&mut self.main_deck),
            Zone::StoneDeck => Some(&mut self.stone_deck),
            Zone::Hand => Some(&mut self.hand),
            Zone::Graveyard => Some(&mut self.graveyard),
            Zone::Removed => Some(&mut self.removed),
            Zone::Standby => Some(&mut self.standby),
            Zone::Field | Zone::Chase | Zone::RulerArea => None,
        }
    }

    /// Reset flags that last one turn.
    pub fn reset_turn_flags(&mut self) {
        self.has_called_stone = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_player() {
        let p = Player::new(PlayerId::from_index(0), "Alice", 4000);
        assert_eq!(p.life, 4000);
        assert!(p.is_in_game());
        assert!(!p.has_lethal_life());
        assert_eq!(p.max_hand_size, 7);
    }

    #[test]
    fn test_zone_list_mapping() {
        let p = Player::new(PlayerId::from_index(0), "Alice", 4000);
        assert!(p.zone_list(Zone::Hand).is_some());
        assert!(p.zone_list(Zone::MainDeck).is_some());
        assert!(p.zone_list(Zone::Field).is_none());
        assert!(p.zone_list(Zone::Chase).is_none());
    }

    #[test]
    fn test_turn_flags_reset() {
        let mut p = Player::new(PlayerId::from_index(0), "Alice", 4000);
        p.has_called_stone = true;
        p.reset_turn_flags();
        assert!(!p.has_called_stone);
    }
}
