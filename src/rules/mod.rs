//! Mandatory game rules: state-based actions and battle.

pub mod combat;
pub mod state_based;

pub use combat::{BattleState, BattleStep, CombatError};
pub use state_based::{LoseReason, StateBasedAction, apply_state_based_actions, check_state_based_actions};
