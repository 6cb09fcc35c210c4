//! Zone-change triggers: enters the field, destroyed, leaves the field.

use crate::events::EventKind;
use crate::events::zones::{EnterFieldEvent, ZoneChangeEvent};
use crate::filter::ObjectFilter;
use crate::zone::Zone;

use super::matcher_trait::{TriggerContext, TriggerMatcher};
use super::trigger_event::TriggerEvent;

/// Pattern for matching zones in zone change events.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ZonePattern {
    /// Match any zone.
    #[default]
    Any,
    /// Match a specific zone.
    Specific(Zone),
    /// Match any zone except this one.
    AnyExcept(Zone),
}

impl ZonePattern {
    pub fn matches(&self, zone: Zone) -> bool {
        match self {
            ZonePattern::Any => true,
            ZonePattern::Specific(z) => zone == *z,
            ZonePattern::AnyExcept(z) => zone != *z,
        }
    }
}

impl From<Zone> for ZonePattern {
    fn from(zone: Zone) -> Self {
        ZonePattern::Specific(zone)
    }
}

/// A composable trigger for zone change events.
///
/// Expresses "when this enters the field", "whenever a resonator is put into
/// a graveyard from the field", "when this card leaves the field", and the
/// other from/to combinations with one type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ZoneChangeTrigger {
    pub from: ZonePattern,
    pub to: ZonePattern,
    /// Filter for matching objects (checked against the leave-zone snapshot
    /// when the object is no longer inspectable).
    pub object_filter: ObjectFilter,
    /// If true, only trigger for the source object ("When this card ...").
    pub this_object: bool,
}

impl ZoneChangeTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from(mut self, zone: impl Into<ZonePattern>) -> Self {
        self.from = zone.into();
        self
    }

    pub fn to(mut self, zone: impl Into<ZonePattern>) -> Self {
        self.to = zone.into();
        self
    }

    pub fn filter(mut self, filter: ObjectFilter) -> Self {
        self.object_filter = filter;
        self
    }

    pub fn this(mut self) -> Self {
        self.this_object = true;
        self
    }

    pub fn this_enters_field() -> Self {
        Self::new().to(Zone::Field).this()
    }

    pub fn enters_field(filter: ObjectFilter) -> Self {
        Self::new().to(Zone::Field).filter(filter)
    }

    pub fn this_is_destroyed() -> Self {
        Self::new().from(Zone::Field).to(Zone::Graveyard).this()
    }

    pub fn destroyed(filter: ObjectFilter) -> Self {
        Self::new().from(Zone::Field).to(Zone::Graveyard).filter(filter)
    }

    pub fn this_leaves_field() -> Self {
        Self::new()
            .from(Zone::Field)
            .to(ZonePattern::AnyExcept(Zone::Field))
            .this()
    }

    fn filter_is_trivial(&self) -> bool {
        self.object_filter == ObjectFilter::default()
    }
}

impl TriggerMatcher for ZoneChangeTrigger {
    fn matches(&self, event: &TriggerEvent, ctx: &TriggerContext) -> bool {
        // Tokens and judgment flips enter the field without a zone change;
        // their enter-field events count as a move onto the field here.
        let (object, from, to, snapshot) = match event.kind() {
            EventKind::ZoneChange => {
                let Some(change) = event.downcast::<ZoneChangeEvent>() else {
                    return false;
                };
                (change.object, change.from, change.to, change.snapshot.as_ref())
            }
            EventKind::EnterField => {
                let Some(enter) = event.downcast::<EnterFieldEvent>() else {
                    return false;
                };
                (enter.object, enter.from, Zone::Field, None)
            }
            _ => return false,
        };

        if !self.from.matches(from) || !self.to.matches(to) {
            return false;
        }

        if self.this_object {
            return object == ctx.source_id;
        }

        if self.filter_is_trivial() {
            return true;
        }

        // Prefer live state; fall back to the snapshot captured before the
        // move for objects that no longer exist or changed characteristics.
        if ctx.game.object(object).is_some() {
            let mut filter = self.object_filter.clone();
            filter.zone = Some(to);
            if filter.matches(ctx.game, object, ctx.controller) {
                return true;
            }
        }

        if let Some(snapshot) = snapshot {
            return snapshot_matches_filter(&self.object_filter, snapshot, ctx);
        }

        false
    }

    fn display(&self) -> String {
        match (self.this_object, &self.from, &self.to) {
            (true, _, ZonePattern::Specific(Zone::Field)) => {
                "when this card enters the field".into()
            }
            (true, ZonePattern::Specific(Zone::Field), ZonePattern::Specific(Zone::Graveyard)) => {
                "when this card is destroyed".into()
            }
            (true, ZonePattern::Specific(Zone::Field), _) => {
                "when this card leaves the field".into()
            }
            (false, _, ZonePattern::Specific(Zone::Field)) => {
                "whenever a matching card enters the field".into()
            }
            (false, ZonePattern::Specific(Zone::Field), ZonePattern::Specific(Zone::Graveyard)) => {
                "whenever a matching card is destroyed".into()
            }
            _ => "whenever a card changes zones".into(),
        }
    }

    fn clone_box(&self) -> Box<dyn TriggerMatcher> {
        Box::new(self.clone())
    }
}

fn snapshot_matches_filter(
    filter: &ObjectFilter,
    snapshot: &crate::snapshot::ObjectSnapshot,
    ctx: &TriggerContext,
) -> bool {
    match filter.controller {
        crate::filter::ControllerRelation::Any => {}
        crate::filter::ControllerRelation::You => {
            if snapshot.controller != ctx.controller {
                return false;
            }
        }
        crate::filter::ControllerRelation::Opponent => {
            if snapshot.controller == ctx.controller {
                return false;
            }
        }
    }
    if !filter.card_types.is_empty() && !filter.card_types.contains(&snapshot.card_type) {
        return false;
    }
    if !filter.attributes.is_empty()
        && !filter.attributes.iter().any(|&a| snapshot.attributes.contains(a))
    {
        return false;
    }
    if !filter.races.is_empty() && !filter.races.iter().any(|r| snapshot.races.contains(r)) {
        return false;
    }
    if let Some(keyword) = filter.has_keyword
        && !snapshot.keywords.contains(keyword)
    {
        return false;
    }
    if let Some(cmp) = filter.atk
        && !cmp.matches(snapshot.atk)
    {
        return false;
    }
    if let Some(cmp) = filter.def
        && !cmp.matches(snapshot.def)
    {
        return false;
    }
    if let Some(is_token) = filter.is_token
        && snapshot.is_token != is_token
    {
        return false;
    }
    true
}
