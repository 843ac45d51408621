//! Playbook contract, shared contract logic and the id-keyed registry.
//!
//! A playbook variant supplies only a setup detector and a parameter set.
//! Regime gating, microstructure confirmation, duplicate suppression, stop
//! evolution, salvage, order-flow exits and target schedules are default
//! methods of the [`Playbook`] trait, driven by the variant's parameters.
//!
//! **Key invariants:**
//! - Playbooks never own or mutate positions; they read `&Position` and
//!   return proposals
//! - Positions and signals refer to a playbook by [`PlaybookId`] only
//! - Every stop returned by `update_stop` has passed the ratchet

pub mod order_flow;
pub mod params;
pub mod ratchet;
pub mod registry;
pub mod salvage;
pub mod stats;
pub mod stops;
pub mod variants;

pub use params::{
    MicroConfirmParams, OrderFlowExitParams, PlaybookParams, SalvageParams, StopParams, TargetSpec,
};
pub use registry::{create_playbook, PlaybookConfig, PlaybookKind, PlaybookRegistry};
pub use stats::{OutcomeTally, PlaybookStats, StatsRegistry};

use crate::domain::{
    Bar, Direction, ExitReason, PlaybookId, Position, ProfitTarget, RegimeAssignment, Signal,
};
use crate::features::FeatureSnapshot;
use crate::microstructure::MicrostructureFeatures;
use crate::numeric::EPSILON;

/// Everything a playbook may look at when deciding on an entry.
#[derive(Debug, Clone, Copy)]
pub struct EntryContext<'a> {
    /// Bars strictly before `bar`, oldest first.
    pub history: &'a [Bar],
    pub bar: &'a Bar,
    pub regime: &'a RegimeAssignment,
    pub features: &'a FeatureSnapshot,
    pub open_positions: &'a [Position],
    /// `None` when no snapshot was resolved for this bar.
    pub micro: Option<&'a MicrostructureFeatures>,
    pub stats: &'a PlaybookStats,
}

/// Market context for stop and salvage decisions on one bar.
#[derive(Debug, Clone, Copy)]
pub struct StopContext<'a> {
    pub history: &'a [Bar],
    pub bar: &'a Bar,
    pub atr: Option<f64>,
    pub stats: &'a PlaybookStats,
}

/// Raw output of a variant's setup detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Setup {
    pub direction: Direction,
    /// Conviction in [0, 1].
    pub strength: f64,
    pub reference_price: f64,
    /// Structural stop; `None` falls back to `initial_stop_atr × ATR`.
    pub stop: Option<f64>,
}

/// Uniform playbook contract. The orchestrator depends only on this trait.
pub trait Playbook: Send + Sync {
    fn id(&self) -> PlaybookId;

    /// Stable name for logging and stats.
    fn name(&self) -> &str;

    fn params(&self) -> &PlaybookParams;

    /// Variant-specific pattern recognition. `atr` is finite and > 0.
    fn detect_setup(&self, ctx: &EntryContext<'_>, atr: f64) -> Option<Setup>;

    /// Candidate signal for this bar, or `None`.
    ///
    /// Rejects when the regime is unusable or outside the preferred set
    /// (unless clarity exceeds the override), when available order-flow does
    /// not confirm the direction, or when a near-duplicate position of this
    /// playbook is already open.
    fn check_entry(&self, ctx: &EntryContext<'_>) -> Option<Signal> {
        let params = self.params();
        if !regime_gate(params, ctx.regime) {
            return None;
        }
        let atr = ctx.features.atr.filter(|a| a.is_finite() && *a > EPSILON)?;

        let setup = self.detect_setup(ctx, atr)?;
        if !setup.strength.is_finite() || setup.strength < params.min_strength {
            return None;
        }
        let strength = setup.strength.clamp(0.0, 1.0);
        let reference = setup.reference_price;
        if !reference.is_finite() || reference <= 0.0 {
            return None;
        }

        if let Some(micro) = ctx.micro {
            if !micro_confirms(&params.micro_confirm, setup.direction, micro) {
                return None;
            }
        }
        if is_near_duplicate(
            self.id(),
            setup.direction,
            reference,
            atr,
            params.duplicate_distance_atr,
            ctx.open_positions,
        ) {
            return None;
        }

        let initial_stop = resolve_stop(&setup, atr, params);
        let risk = (reference - initial_stop).abs();
        if risk < EPSILON {
            return None;
        }

        Some(Signal {
            playbook_id: self.id(),
            timestamp: ctx.bar.timestamp,
            direction: setup.direction,
            reference_price: reference,
            initial_stop,
            targets: self.profit_targets(reference, setup.direction, risk),
            strength,
            regime_alignment: ctx.regime.probability_of(&params.preferred_regimes),
        })
    }

    /// New stop level for the position's current phase, ratcheted.
    fn update_stop(&self, position: &Position, ctx: &StopContext<'_>) -> f64 {
        let proposal = stops::propose(
            position,
            ctx.history,
            ctx.bar,
            ctx.atr,
            &self.params().stops,
            ctx.stats,
        );
        match proposal {
            Some(level) => ratchet::tighten(position.direction, position.current_stop, level),
            None => position.current_stop,
        }
    }

    /// True if the position should be salvaged at the close of this bar.
    fn check_salvage(&self, position: &Position, ctx: &StopContext<'_>) -> bool {
        salvage::should_salvage(position, ctx.history, ctx.bar, &self.params().salvage)
    }

    fn check_order_flow_exit(
        &self,
        position: &Position,
        micro: &MicrostructureFeatures,
    ) -> Option<ExitReason> {
        order_flow::check(position, micro, &self.params().order_flow_exit)
    }

    /// Ordered (price, fraction) schedule summing to 1.0.
    fn profit_targets(&self, entry: f64, direction: Direction, risk: f64) -> Vec<ProfitTarget> {
        self.params()
            .targets
            .iter()
            .map(|t| ProfitTarget {
                price: entry + direction.sign() * t.r_multiple * risk,
                fraction: t.fraction,
                r_multiple: t.r_multiple,
            })
            .collect()
    }
}

// ─── Shared contract checks ──────────────────────────────────────────

/// Preferred-regime gate with clarity override. Fails closed on an
/// unusable assignment.
pub fn regime_gate(params: &PlaybookParams, regime: &RegimeAssignment) -> bool {
    if !regime.usable {
        return false;
    }
    params.preferred_regimes.contains(&regime.label) || regime.clarity > params.clarity_override
}

/// Direction-matched order-flow imbalance reaches `min_ofi` and depth
/// imbalance corroborates. Unavailable snapshots pass.
pub fn micro_confirms(
    params: &MicroConfirmParams,
    direction: Direction,
    micro: &MicrostructureFeatures,
) -> bool {
    if !params.enabled || !micro.is_available() {
        return true;
    }
    let ofi = direction.sign() * micro.order_flow_imbalance;
    let depth = direction.sign() * micro.depth_imbalance;
    ofi >= params.min_ofi && depth >= params.min_depth_imbalance
}

/// A same-direction open position of the same playbook within
/// `distance_atr × ATR` of the reference price.
pub fn is_near_duplicate(
    id: PlaybookId,
    direction: Direction,
    reference: f64,
    atr: f64,
    distance_atr: f64,
    open_positions: &[Position],
) -> bool {
    let limit = distance_atr * atr;
    open_positions.iter().any(|p| {
        p.playbook_id == id && p.direction == direction && (p.entry_price - reference).abs() <= limit
    })
}

/// Setup stop if it sits on the protective side, else the ATR default;
/// widened to at least `min_stop_atr × ATR`.
pub fn resolve_stop(setup: &Setup, atr: f64, params: &PlaybookParams) -> f64 {
    let sign = setup.direction.sign();
    let reference = setup.reference_price;
    let default_distance = params.initial_stop_atr * atr;
    let distance = match setup.stop {
        Some(stop) if stop.is_finite() && (reference - stop) * sign > 0.0 => (reference - stop).abs(),
        _ => default_distance,
    };
    let distance = distance.max(params.min_stop_atr * atr);
    reference - sign * distance
}
