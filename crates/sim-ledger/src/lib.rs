#![deny(warnings)]

//! Resource ledger and phase state machine for Atelier Tycoon.
//!
//! The [`Ledger`] owns the authoritative [`GameState`] and is the only writer
//! to it. Phase transitions follow the strict day cycle; resource spends
//! distinguish contract violations (zero amounts, `Err`) from ordinary
//! shortfalls (`Ok(false)`). The action-point overflow calculator lives here
//! too: a pure function mapping an over-budget spend onto elapsed days.

use serde::{Deserialize, Serialize};
use sim_core::{GameConfig, GameEvent, GameState, Phase, StatePatch};
use sim_events::EventBus;
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, info};

/// Errors produced by ledger operations. Insufficient gold or action points
/// are not errors; they come back as `Ok(false)`.
#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    /// The requested phase is not reachable from the current one.
    #[error("cannot transition from {from:?} to {to:?}")]
    InvalidTransition { from: Phase, to: Phase },
    /// Spend/add amounts must be at least 1.
    #[error("amount must be >= 1")]
    InvalidAmount,
    #[error(transparent)]
    Overflow(#[from] OverflowError),
}

/// Owner of the mutable game state.
pub struct Ledger {
    state: GameState,
    config: GameConfig,
    events: Rc<EventBus<GameEvent>>,
}

impl Ledger {
    /// A ledger at the default starting state for `config`.
    pub fn new(config: GameConfig, events: Rc<EventBus<GameEvent>>) -> Self {
        let state = GameState::new(&config);
        Self {
            state,
            config,
            events,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Strict cycle policy: only the next phase of the day cycle is a valid
    /// target, and a phase never transitions to itself.
    pub fn can_transition_to(&self, phase: Phase) -> bool {
        phase == self.state.phase.next()
    }

    pub fn set_phase(&mut self, phase: Phase) -> Result<(), LedgerError> {
        if !self.can_transition_to(phase) {
            return Err(LedgerError::InvalidTransition {
                from: self.state.phase,
                to: phase,
            });
        }
        let previous = self.state.phase;
        self.state.phase = phase;
        debug!(?previous, next = ?phase, "phase transition");
        self.events.publish(GameEvent::PhaseChanged {
            previous,
            next: phase,
        });
        Ok(())
    }

    /// Move to the next day: bump the day counter, burn one remaining day,
    /// restore the action point budget.
    pub fn advance_day(&mut self) {
        self.state.day += 1;
        self.state.remaining_days = self.state.remaining_days.saturating_sub(1);
        self.state.action_points = self.config.max_action_points;
        info!(day = self.state.day, remaining = self.state.remaining_days, "day started");
        self.events.publish(GameEvent::DayStarted {
            day: self.state.day,
            remaining_days: self.state.remaining_days,
        });
    }

    /// Deduct `amount` action points. `Ok(false)` and no mutation when the
    /// balance is short.
    pub fn spend_action_points(&mut self, amount: u32) -> Result<bool, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        if self.state.action_points < amount {
            return Ok(false);
        }
        self.state.action_points -= amount;
        Ok(true)
    }

    /// Overflow-aware spend: an amount beyond today's balance rolls into
    /// subsequent days via [`calculate_overflow`], advancing the day once per
    /// overflowed budget and landing on the calculator's next-day balance.
    pub fn consume_action_points(&mut self, amount: u32) -> Result<ApOverflow, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        let overflow = calculate_overflow(
            self.state.action_points,
            amount,
            self.config.max_action_points,
        )?;
        if overflow.days_consumed == 0 {
            self.state.action_points = overflow.remaining_ap;
        } else {
            for _ in 0..overflow.days_consumed {
                self.advance_day();
            }
            self.state.action_points = overflow.next_day_ap;
        }
        Ok(overflow)
    }

    pub fn add_gold(&mut self, amount: u64) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        self.state.gold += amount;
        Ok(())
    }

    /// Deduct `amount` gold. `Ok(false)` and no mutation on insufficient
    /// funds.
    pub fn spend_gold(&mut self, amount: u64) -> Result<bool, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        if self.state.gold < amount {
            return Ok(false);
        }
        self.state.gold -= amount;
        Ok(true)
    }

    /// Accumulate promotion progress. Crossing the configured threshold
    /// promotes to the next rank, carrying the surplus over; the returned
    /// value is the gauge after the add and any promotions.
    pub fn add_contribution(&mut self, amount: u32) -> Result<u32, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        self.state.promotion_gauge += amount;
        self.events.publish(GameEvent::ContributionAdded {
            amount,
            total: self.state.promotion_gauge,
        });
        while let Some(threshold) = self.config.promotion_threshold(self.state.rank) {
            if self.state.promotion_gauge < threshold {
                break;
            }
            let previous = self.state.rank;
            let next = match previous.next() {
                Some(next) => next,
                None => break,
            };
            self.state.promotion_gauge -= threshold;
            self.state.rank = next;
            info!(?previous, ?next, "rank promoted");
            self.events
                .publish(GameEvent::RankPromoted { previous, next });
        }
        Ok(self.state.promotion_gauge)
    }

    /// Merge a partial state without gameplay-rule checks.
    pub fn update_state(&mut self, patch: &StatePatch) {
        patch.apply_to(&mut self.state);
    }

    /// Reset to the default state, optionally merged with an override.
    pub fn initialize(&mut self, patch: Option<&StatePatch>) {
        self.state = GameState::new(&self.config);
        if let Some(patch) = patch {
            patch.apply_to(&mut self.state);
        }
    }

    /// Reset to the default state.
    pub fn reset(&mut self) {
        self.initialize(None);
    }

    /// A plain serializable copy of the current state.
    pub fn export_snapshot(&self) -> GameState {
        self.state.clone()
    }

    /// Replace the current state wholesale.
    pub fn load_snapshot(&mut self, snapshot: GameState) {
        self.state = snapshot;
    }
}

/// Result of mapping an action-point spend onto day boundaries.
///
/// `next_day_ap` is meaningful only when `has_overflow` is set; the exact
/// multiple case yields a full budget rather than zero, so a day boundary is
/// always observable in the balance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApOverflow {
    pub has_overflow: bool,
    /// Points spent beyond the current balance.
    pub overflow_ap: u32,
    /// Whole days exhausted by the overflow.
    pub days_consumed: u32,
    /// Balance on the day the spend lands on.
    pub next_day_ap: u32,
    /// Balance left on the current day; zero in every overflow case.
    pub remaining_ap: u32,
}

/// Errors from the overflow calculator.
#[derive(Debug, Error, PartialEq)]
pub enum OverflowError {
    #[error("max action points must be >= 1")]
    InvalidMaxAp,
}

/// Map an attempted spend of `consume_ap` against `current_ap` onto elapsed
/// days under a per-day budget of `max_ap`.
///
/// Example:
/// let o = calculate_overflow(3, 4, 3).unwrap();
/// assert!(o.has_overflow && o.days_consumed == 1 && o.next_day_ap == 2);
pub fn calculate_overflow(
    current_ap: u32,
    consume_ap: u32,
    max_ap: u32,
) -> Result<ApOverflow, OverflowError> {
    if max_ap == 0 {
        return Err(OverflowError::InvalidMaxAp);
    }
    if consume_ap <= current_ap {
        return Ok(ApOverflow {
            has_overflow: false,
            overflow_ap: 0,
            days_consumed: 0,
            next_day_ap: 0,
            remaining_ap: current_ap - consume_ap,
        });
    }
    let overflow_ap = consume_ap - current_ap;
    let days_consumed = overflow_ap.div_ceil(max_ap);
    let rem = overflow_ap % max_ap;
    // The landing day keeps whatever the spilled-over points left of its
    // budget; an exact multiple lands on a full fresh budget, never zero.
    let next_day_ap = if rem == 0 { max_ap } else { max_ap - rem };
    Ok(ApOverflow {
        has_overflow: true,
        overflow_ap,
        days_consumed,
        next_day_ap,
        remaining_ap: 0,
    })
}
