//! Will costs and will pools.
//!
//! Will is produced by magic stones (and a few other sources) and spent to pay
//! card and ability costs. A cost is a set of attribute pips plus a generic
//! component payable with will of any attribute.

use crate::types::Attribute;

/// A will cost: attribute pips that must each be paid with matching will,
/// plus a generic component payable with anything.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct WillCost {
    pips: Vec<Attribute>,
    generic: u32,
}

impl WillCost {
    /// Creates an empty (free) cost.
    pub fn free() -> Self {
        Self::default()
    }

    pub fn new(pips: Vec<Attribute>, generic: u32) -> Self {
        Self { pips, generic }
    }

    /// A cost of only generic will, e.g. `{2}`.
    pub fn generic(amount: u32) -> Self {
        Self {
            pips: Vec::new(),
            generic: amount,
        }
    }

    /// A cost of a single attribute pip plus generic, e.g. `{R}{2}`.
    pub fn of(attribute: Attribute, generic: u32) -> Self {
        Self {
            pips: vec![attribute],
            generic,
        }
    }

    pub fn pips(&self) -> &[Attribute] {
        &self.pips
    }

    pub fn generic_component(&self) -> u32 {
        self.generic
    }

    /// Total cost: one per pip plus the generic component.
    pub fn total(&self) -> u32 {
        self.pips.len() as u32 + self.generic
    }

    pub fn is_free(&self) -> bool {
        self.pips.is_empty() && self.generic == 0
    }
}

/// A player's will pool, emptied at phase boundaries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct WillPool {
    pub light: u32,
    pub fire: u32,
    pub water: u32,
    pub wind: u32,
    pub darkness: u32,
    pub void: u32,
}

impl WillPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds will of the specified attribute.
    pub fn add(&mut self, attribute: Attribute, amount: u32) {
        match attribute {
            Attribute::Light => self.light += amount,
            Attribute::Fire => self.fire += amount,
            Attribute::Water => self.water += amount,
            Attribute::Wind => self.wind += amount,
            Attribute::Darkness => self.darkness += amount,
            Attribute::Void => self.void += amount,
        }
    }

    fn slot(&mut self, attribute: Attribute) -> &mut u32 {
        match attribute {
            Attribute::Light => &mut self.light,
            Attribute::Fire => &mut self.fire,
            Attribute::Water => &mut self.water,
            Attribute::Wind => &mut self.wind,
            Attribute::Darkness => &mut self.darkness,
            Attribute::Void => &mut self.void,
        }
    }

    /// How much will of the given attribute is in the pool.
    pub fn available(&self, attribute: Attribute) -> u32 {
        self.amount(attribute)
    }

    fn amount(&self, attribute: Attribute) -> u32 {
        match attribute {
            Attribute::Light => self.light,
            Attribute::Fire => self.fire,
            Attribute::Water => self.water,
            Attribute::Wind => self.wind,
            Attribute::Darkness => self.darkness,
            Attribute::Void => self.void,
        }
    }

    /// Returns the total amount of will in the pool.
    pub fn total(&self) -> u32 {
        self.light + self.fire + self.water + self.wind + self.darkness + self.void
    }

    /// Empties the pool.
    pub fn empty(&mut self) {
        *self = Self::default();
    }

    /// Checks whether the cost is payable from this pool.
    ///
    /// With `any_will_pays_pips`, attribute pips may be paid with will of any
    /// attribute (granted by certain ruler abilities).
    pub fn can_pay(&self, cost: &WillCost, any_will_pays_pips: bool) -> bool {
        if any_will_pays_pips {
            return self.total() >= cost.total();
        }

        let mut remaining = self.clone();
        for &pip in cost.pips() {
            let slot = remaining.slot(pip);
            if *slot == 0 {
                return false;
            }
            *slot -= 1;
        }
        remaining.total() >= cost.generic_component()
    }

    /// Pays the cost from this pool. Returns false (pool unchanged) if the
    /// cost cannot be paid.
    ///
    /// Generic will is paid void-first, then from the largest attribute stock;
    /// largest-first keeps pip-colored will available for later payments.
    pub fn pay(&mut self, cost: &WillCost, any_will_pays_pips: bool) -> bool {
        if !self.can_pay(cost, any_will_pays_pips) {
            return false;
        }

        let mut working = self.clone();

        for &pip in cost.pips() {
            let paid = if any_will_pays_pips && working.amount(pip) == 0 {
                working.remove_any(1)
            } else {
                let slot = working.slot(pip);
                if *slot > 0 {
                    *slot -= 1;
                    true
                } else {
                    working.remove_any(1)
                }
            };
            if !paid {
                return false;
            }
        }

        if !working.remove_any(cost.generic_component()) {
            return false;
        }

        *self = working;
        true
    }

    fn remove_any(&mut self, mut amount: u32) -> bool {
        if self.total() < amount {
            return false;
        }
        while amount > 0 {
            if self.void > 0 {
                let take = self.void.min(amount);
                self.void -= take;
                amount -= take;
                continue;
            }
            let largest = Attribute::ALL
                .into_iter()
                .max_by_key(|&a| self.amount(a))
                .expect("attribute list is non-empty");
            let slot = self.slot(largest);
            let take = (*slot).min(amount);
            *slot -= take;
            amount -= take;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cost_total() {
        let cost = WillCost::new(vec![Attribute::Fire, Attribute::Fire], 2);
        assert_eq!(cost.total(), 4);
        assert!(!cost.is_free());
        assert!(WillCost::free().is_free());
    }

    #[test]
    fn test_can_pay_exact_pips() {
        let mut pool = WillPool::new();
        pool.add(Attribute::Fire, 2);
        pool.add(Attribute::Void, 1);

        let cost = WillCost::new(vec![Attribute::Fire, Attribute::Fire], 1);
        assert!(pool.can_pay(&cost, false));

        let too_much = WillCost::new(vec![Attribute::Fire, Attribute::Fire], 2);
        assert!(!pool.can_pay(&too_much, false));
    }

    #[test]
    fn test_missing_pip_attribute() {
        let mut pool = WillPool::new();
        pool.add(Attribute::Water, 3);

        let cost = WillCost::of(Attribute::Fire, 0);
        assert!(!pool.can_pay(&cost, false));
        // Ruler grants "pay with any attribute"
        assert!(pool.can_pay(&cost, true));
    }

    #[test]
    fn test_pay_prefers_void_for_generic() {
        let mut pool = WillPool::new();
        pool.add(Attribute::Fire, 1);
        pool.add(Attribute::Void, 2);

        let cost = WillCost::generic(2);
        assert!(pool.pay(&cost, false));
        assert_eq!(pool.fire, 1);
        assert_eq!(pool.void, 0);
    }

    #[test]
    fn test_pay_is_atomic_on_failure() {
        let mut pool = WillPool::new();
        pool.add(Attribute::Fire, 1);

        let cost = WillCost::new(vec![Attribute::Fire], 1);
        assert!(!pool.pay(&cost, false));
        assert_eq!(pool.fire, 1);
    }
}
