//! Core card typing: card types, attributes, races, and keyword abilities.

/// Card types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum CardType {
    Ruler,
    JRuler,
    #[default]
    Resonator,
    Chant,
    ChantInstant,
    ChantStandby,
    AdditionField,
    AdditionResonator,
    Regalia,
    MagicStone,
    SpecialMagicStone,
}

impl CardType {
    /// Resonators and J-Rulers fight and take damage.
    pub fn is_combatant(self) -> bool {
        matches!(self, CardType::Resonator | CardType::JRuler)
    }

    /// Chant-type cards resolve on the Chase and then leave it.
    pub fn is_chant(self) -> bool {
        matches!(
            self,
            CardType::Chant | CardType::ChantInstant | CardType::ChantStandby
        )
    }

    pub fn is_stone(self) -> bool {
        matches!(self, CardType::MagicStone | CardType::SpecialMagicStone)
    }

    pub fn is_addition(self) -> bool {
        matches!(self, CardType::AdditionField | CardType::AdditionResonator)
    }

    /// Card types that stay on the field as permanents after resolving.
    pub fn is_permanent(self) -> bool {
        matches!(
            self,
            CardType::Resonator
                | CardType::JRuler
                | CardType::AdditionField
                | CardType::AdditionResonator
                | CardType::Regalia
                | CardType::MagicStone
                | CardType::SpecialMagicStone
        )
    }
}

/// The five attributes plus void (attribute-less).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum Attribute {
    Light,
    Fire,
    Water,
    Wind,
    Darkness,
    #[default]
    Void,
}

impl Attribute {
    pub const ALL: [Attribute; 5] = [
        Attribute::Light,
        Attribute::Fire,
        Attribute::Water,
        Attribute::Wind,
        Attribute::Darkness,
    ];
}

/// A set of attributes represented as bitflags for efficient operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct AttributeSet(u8);

impl AttributeSet {
    pub const NONE: Self = Self(0);
    pub const LIGHT: Self = Self(1 << 0);
    pub const FIRE: Self = Self(1 << 1);
    pub const WATER: Self = Self(1 << 2);
    pub const WIND: Self = Self(1 << 3);
    pub const DARKNESS: Self = Self(1 << 4);

    pub const fn new() -> Self {
        Self(0)
    }

    pub const fn from_attribute(attribute: Attribute) -> Self {
        match attribute {
            Attribute::Light => Self::LIGHT,
            Attribute::Fire => Self::FIRE,
            Attribute::Water => Self::WATER,
            Attribute::Wind => Self::WIND,
            Attribute::Darkness => Self::DARKNESS,
            Attribute::Void => Self::NONE,
        }
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, attribute: Attribute) -> bool {
        self.0 & Self::from_attribute(attribute).0 != 0
    }

    pub const fn union(self, other: AttributeSet) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn intersection(self, other: AttributeSet) -> Self {
        Self(self.0 & other.0)
    }

    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    pub const fn with(self, attribute: Attribute) -> Self {
        self.union(Self::from_attribute(attribute))
    }

    pub const fn without(self, attribute: Attribute) -> Self {
        Self(self.0 & !Self::from_attribute(attribute).0)
    }
}

impl From<Attribute> for AttributeSet {
    fn from(attribute: Attribute) -> Self {
        Self::from_attribute(attribute)
    }
}

impl FromIterator<Attribute> for AttributeSet {
    fn from_iter<T: IntoIterator<Item = Attribute>>(iter: T) -> Self {
        iter.into_iter()
            .fold(AttributeSet::NONE, |set, a| set.with(a))
    }
}

/// Races (common ones; the authoring collaborator supplies these).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum Race {
    FairyTale,
    Dragon,
    Beast,
    Human,
    Vampire,
    Elf,
    Fairy,
    Wizard,
    Knight,
    Angel,
    Demon,
    Spirit,
    Wanderer,
    Machine,
}

/// Keyword abilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum Keyword {
    Swiftness,
    Flying,
    FirstStrike,
    Pierce,
    Drain,
    Imperishable,
    Quickcast,
    TargetAttack,
    Precision,
    Barrier,
    Explode,
    Stealth,
    Vigilance,
    Indestructible,
    Unblockable,
    CannotAttack,
    CannotBlock,
}

impl Keyword {
    const fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

/// A set of keywords represented as bitflags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct KeywordSet(u32);

impl KeywordSet {
    pub const NONE: Self = Self(0);

    pub const fn new() -> Self {
        Self(0)
    }

    pub const fn from_keyword(keyword: Keyword) -> Self {
        Self(keyword.bit())
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, keyword: Keyword) -> bool {
        self.0 & keyword.bit() != 0
    }

    pub const fn union(self, other: KeywordSet) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn with(self, keyword: Keyword) -> Self {
        Self(self.0 | keyword.bit())
    }

    pub const fn without(self, keyword: Keyword) -> Self {
        Self(self.0 & !keyword.bit())
    }

    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }
}

impl From<Keyword> for KeywordSet {
    fn from(keyword: Keyword) -> Self {
        Self::from_keyword(keyword)
    }
}

impl FromIterator<Keyword> for KeywordSet {
    fn from_iter<T: IntoIterator<Item = Keyword>>(iter: T) -> Self {
        iter.into_iter()
            .fold(KeywordSet::NONE, |set, k| set.with(k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_type_predicates() {
        assert!(CardType::Resonator.is_combatant());
        assert!(CardType::JRuler.is_combatant());
        assert!(!CardType::Chant.is_combatant());

        assert!(CardType::ChantInstant.is_chant());
        assert!(!CardType::Resonator.is_chant());

        assert!(CardType::MagicStone.is_stone());
        assert!(CardType::Resonator.is_permanent());
        assert!(!CardType::Chant.is_permanent());
    }

    #[test]
    fn test_attribute_set_operations() {
        let set = AttributeSet::from_attribute(Attribute::Fire).with(Attribute::Water);
        assert!(set.contains(Attribute::Fire));
        assert!(set.contains(Attribute::Water));
        assert!(!set.contains(Attribute::Light));
        assert_eq!(set.count(), 2);

        let removed = set.without(Attribute::Fire);
        assert!(!removed.contains(Attribute::Fire));
        assert_eq!(removed.count(), 1);
    }

    #[test]
    fn test_void_adds_nothing() {
        let set = AttributeSet::new().with(Attribute::Void);
        assert!(set.is_empty());
    }

    #[test]
    fn test_keyword_set_operations() {
        let set = KeywordSet::from_keyword(Keyword::Flying).with(Keyword::Barrier);
        assert!(set.contains(Keyword::Flying));
        assert!(set.contains(Keyword::Barrier));
        assert!(!set.contains(Keyword::Pierce));

        let removed = set.without(Keyword::Flying);
        assert!(!removed.contains(Keyword::Flying));
        assert!(removed.contains(Keyword::Barrier));
    }

    #[test]
    fn test_keyword_set_from_iter() {
        let set: KeywordSet = [Keyword::Swiftness, Keyword::Drain].into_iter().collect();
        assert_eq!(set.count(), 2);
    }
}
