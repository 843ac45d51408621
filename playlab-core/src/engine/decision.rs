//! `DecisionCore`: owns every open position and runs the per-bar cycle.
//!
//! **Key invariants:**
//! - Bars arrive strictly increasing in timestamp
//! - Positions are mutated only here, through the lifecycle functions
//! - Arbitration weights change only in `learn`, once per closed trade
//! - Open count and total heat never exceed their ceilings

use chrono::NaiveDateTime;
use tracing::{debug, trace};

use crate::arbitration::{ArbitrationContext, Arbitrator};
use crate::config::{ConfigError, CoreConfig};
use crate::domain::{
    Action, Bar, ClosedTrade, ExitReason, IdGen, OrderBookSnapshot, Position, RegimeAssignment,
};
use crate::features::{FeatureEngine, FeatureSnapshot};
use crate::microstructure::{self, MicrostructureFeatures};
use crate::playbook::{EntryContext, PlaybookRegistry, PlaybookStats, StatsRegistry};
use crate::regime::RegimeClassifier;
use crate::sizing::{open_heat, CorrelationTracker, SizingManager};

use super::invariants;
use super::lifecycle::{self, BarContext, Outcome};
use super::stats::{CoreStats, Counters};
use super::CoreError;

pub struct DecisionCore {
    config: CoreConfig,
    features: FeatureEngine,
    classifier: RegimeClassifier,
    registry: PlaybookRegistry,
    stats: StatsRegistry,
    arbitrator: Arbitrator,
    sizing: SizingManager,
    correlations: CorrelationTracker,
    positions: Vec<Position>,
    closed: Vec<ClosedTrade>,
    ids: IdGen,
    counters: Counters,
    last_timestamp: Option<NaiveDateTime>,
    last_close: Option<f64>,
    last_regime: Option<RegimeAssignment>,
}

impl DecisionCore {
    /// Validate the configuration and build every component.
    pub fn new(config: CoreConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let registry = PlaybookRegistry::from_configs(&config.playbooks)?;
        let ids = registry.ids();
        Ok(Self {
            features: FeatureEngine::new(config.features.clone()),
            classifier: RegimeClassifier::new(config.regime_model.clone())?,
            stats: StatsRegistry::new(ids.iter().copied()),
            arbitrator: Arbitrator::new(config.arbitrator.clone())?,
            sizing: SizingManager::new(config.sizing.clone())?,
            correlations: CorrelationTracker::with_playbooks(config.sizing.correlation_window, ids),
            registry,
            positions: Vec::new(),
            closed: Vec::new(),
            ids: IdGen::default(),
            counters: Counters::default(),
            last_timestamp: None,
            last_close: None,
            last_regime: None,
            config,
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn registry(&self) -> &PlaybookRegistry {
        &self.registry
    }

    pub fn open_positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn closed_trades(&self) -> &[ClosedTrade] {
        &self.closed
    }

    /// Regime assigned on the most recent bar.
    pub fn last_regime(&self) -> Option<&RegimeAssignment> {
        self.last_regime.as_ref()
    }

    pub fn playbook_stats(&self) -> &StatsRegistry {
        &self.stats
    }

    pub fn arbitrator(&self) -> &Arbitrator {
        &self.arbitrator
    }

    /// Process one bar. `history` holds the bars before `bar`, oldest first.
    pub fn on_bar(
        &mut self,
        bar: &Bar,
        history: &[Bar],
        snapshot: Option<&OrderBookSnapshot>,
    ) -> Result<Vec<Action>, CoreError> {
        self.accept_bar(bar)?;

        let features = self.features.compute(history, bar);
        let regime = self.classifier.classify(&features);
        self.record_regime(&regime);
        let micro = microstructure::compute(snapshot, &self.config.microstructure);
        let micro = micro.is_available().then_some(&micro);

        if let Some(prev) = self.last_close {
            self.correlations.record_bar(&self.positions, bar.close - prev);
        }
        self.last_close = Some(bar.close);

        let session_closed = self
            .config
            .lifecycle
            .session_close
            .is_some_and(|t| bar.timestamp.time() >= t);

        let mut actions = Vec::new();
        self.manage_positions(bar, history, &features, micro, session_closed, &mut actions)?;
        if !session_closed {
            self.admit_entry(bar, history, &features, &regime, micro, &mut actions)?;
        }

        invariants::check_portfolio(
            &self.positions,
            self.config.lifecycle.max_open_positions,
            self.config.sizing.heat_ceiling,
        )?;
        for position in &self.positions {
            invariants::check_position(position)?;
        }
        self.counters.peak_heat = self.counters.peak_heat.max(open_heat(&self.positions));
        Ok(actions)
    }

    /// Close every open position at the bar's close.
    pub fn flatten(&mut self, bar: &Bar, reason: ExitReason) -> Result<Vec<Action>, CoreError> {
        let mut actions = Vec::new();
        for mut position in std::mem::take(&mut self.positions) {
            position.extend_excursion_to(bar.close);
            if let Outcome::Closed(trade, risk) = lifecycle::exit(position, bar.close, reason, bar, &mut actions) {
                self.settle(trade, risk)?;
            }
        }
        Ok(actions)
    }

    /// Take over an already-open position, e.g. when resuming a session.
    pub fn adopt_position(&mut self, position: Position) -> Result<(), CoreError> {
        if !self.registry.contains(position.playbook_id) {
            return Err(CoreError::UnknownPlaybook(position.playbook_id));
        }
        if self.positions.iter().any(|p| p.id == position.id) {
            return Err(CoreError::DuplicatePosition(position.id));
        }
        invariants::check_position(&position)?;
        self.ids.observe(position.id);
        let mut candidate = self.positions.clone();
        candidate.push(position);
        invariants::check_portfolio(
            &candidate,
            self.config.lifecycle.max_open_positions,
            self.config.sizing.heat_ceiling,
        )?;
        self.positions = candidate;
        Ok(())
    }

    pub fn get_stats(&self) -> CoreStats {
        CoreStats::new(
            self.counters.clone(),
            self.positions.len(),
            open_heat(&self.positions),
            self.stats.as_map().clone(),
            *self.arbitrator.weights(),
        )
    }

    // ─── Per-bar steps ───────────────────────────────────────────────

    fn accept_bar(&mut self, bar: &Bar) -> Result<(), CoreError> {
        if !bar.is_sane() {
            return Err(CoreError::MalformedBar(bar.timestamp));
        }
        if let Some(previous) = self.last_timestamp {
            if bar.timestamp <= previous {
                return Err(CoreError::OutOfOrder {
                    previous,
                    current: bar.timestamp,
                });
            }
        }
        self.last_timestamp = Some(bar.timestamp);
        self.counters.bars_processed += 1;
        Ok(())
    }

    fn record_regime(&mut self, regime: &RegimeAssignment) {
        if regime.usable {
            *self.counters.regime_counts.entry(regime.label).or_default() += 1;
        } else {
            self.counters.undetermined_regimes += 1;
        }
        self.last_regime = Some(*regime);
    }

    fn manage_positions(
        &mut self,
        bar: &Bar,
        history: &[Bar],
        features: &FeatureSnapshot,
        micro: Option<&MicrostructureFeatures>,
        session_closed: bool,
        actions: &mut Vec<Action>,
    ) -> Result<(), CoreError> {
        let ctx = BarContext {
            bar,
            history,
            atr: features.atr,
            micro,
            session_closed,
        };
        let empty = PlaybookStats::default();
        let mut still_open = Vec::with_capacity(self.positions.len());
        let mut closed = Vec::new();
        for position in std::mem::take(&mut self.positions) {
            let Some(playbook) = self.registry.get(position.playbook_id) else {
                return Err(CoreError::UnknownPlaybook(position.playbook_id));
            };
            let stats = self.stats.get(position.playbook_id).unwrap_or(&empty);
            match lifecycle::manage(position, playbook, stats, &ctx, actions) {
                Outcome::Open(p) => still_open.push(p),
                Outcome::Closed(trade, risk) => closed.push((trade, risk)),
            }
        }
        self.positions = still_open;
        for (trade, risk) in closed {
            self.settle(trade, risk)?;
        }
        Ok(())
    }

    /// Record a closed trade: invariant check, stats, weight learning.
    fn settle(&mut self, trade: ClosedTrade, risk: f64) -> Result<(), CoreError> {
        invariants::check_closed_trade(&trade, risk)?;
        self.stats.record_trade(&trade);
        self.counters.record_trade(&trade);
        self.arbitrator.learn(&trade);
        self.closed.push(trade);
        Ok(())
    }

    fn admit_entry(
        &mut self,
        bar: &Bar,
        history: &[Bar],
        features: &FeatureSnapshot,
        regime: &RegimeAssignment,
        micro: Option<&MicrostructureFeatures>,
        actions: &mut Vec<Action>,
    ) -> Result<(), CoreError> {
        if self.positions.len() >= self.config.lifecycle.max_open_positions {
            return Ok(());
        }

        let empty = PlaybookStats::default();
        let mut candidates = Vec::new();
        for playbook in self.registry.iter() {
            let stats = self.stats.get(playbook.id()).unwrap_or(&empty);
            if self.benched(stats, regime) {
                trace!(playbook = %playbook.id(), regime = %regime.label, "benched by regime record");
                continue;
            }
            let ctx = EntryContext {
                history,
                bar,
                regime,
                features,
                open_positions: &self.positions,
                micro,
                stats,
            };
            if let Some(signal) = playbook.check_entry(&ctx) {
                candidates.push(signal);
            }
        }
        if candidates.is_empty() {
            return Ok(());
        }
        self.counters.signals_raised += candidates.len();

        let outcome = self.arbitrator.arbitrate(
            candidates,
            &ArbitrationContext {
                stats: &self.stats,
                open_positions: &self.positions,
                correlations: &self.correlations,
                hour: bar.hour(),
            },
        );
        self.counters.signals_suppressed += outcome.suppressed.len();
        for signal in outcome.scored.iter().map(|s| &s.signal).chain(outcome.suppressed.iter()) {
            self.stats.get_mut(signal.playbook_id).record_strength(signal.strength);
        }

        let Some(selected) = outcome.selected else {
            return Ok(());
        };
        self.counters.signals_selected += 1;

        let Some(decision) = self.sizing.size(
            &selected.signal,
            regime,
            features,
            &self.positions,
            &self.correlations,
        ) else {
            self.counters.sizing_rejections += 1;
            return Ok(());
        };

        let id = self.ids.next_position_id();
        let position = Position::open(id, &selected.signal, decision.size, regime.label, selected.factors);
        debug!(
            position = %id,
            playbook = %selected.signal.playbook_id,
            direction = ?selected.signal.direction,
            price = selected.signal.reference_price,
            stop = selected.signal.initial_stop,
            size = decision.size,
            score = selected.score,
            "entry"
        );
        actions.push(Action::Enter {
            position_id: id,
            signal: selected.signal,
            size: decision.size,
        });
        self.positions.push(position);
        self.counters.entries += 1;
        Ok(())
    }

    /// A playbook with enough trades in this regime and a poor record there
    /// sits the regime out.
    fn benched(&self, stats: &PlaybookStats, regime: &RegimeAssignment) -> bool {
        let lifecycle = &self.config.lifecycle;
        let tally = stats.regime(regime.label);
        tally.count >= lifecycle.regime_filter_min_trades.max(1)
            && tally
                .expectancy()
                .is_some_and(|e| e < lifecycle.regime_filter_floor_r)
    }
}
