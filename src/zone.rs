#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum Zone {
    MainDeck,
    StoneDeck,
    Hand,
    Field,
    RulerArea,
    Graveyard,
    Removed,
    Standby,
    Chase,
}

impl Zone {
    /// Returns true if objects in this zone are public (visible to all players).
    pub fn is_public(&self) -> bool {
        matches!(
            self,
            Zone::Field | Zone::RulerArea | Zone::Graveyard | Zone::Removed | Zone::Chase
        )
    }

    /// Returns true if objects in this zone are hidden (private to owner).
    ///
    /// Standby cards sit face-down: their existence is public, their identity
    /// is not.
    pub fn is_hidden(&self) -> bool {
        matches!(
            self,
            Zone::MainDeck | Zone::StoneDeck | Zone::Hand | Zone::Standby
        )
    }

    /// Returns true if cards in this zone are ordered (order matters).
    pub fn is_ordered(&self) -> bool {
        matches!(self, Zone::MainDeck | Zone::StoneDeck | Zone::Chase)
    }
}
