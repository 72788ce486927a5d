use foundation::Millis;
use runtime::TimerSlots;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    pub initial_tolerance: f64,
    pub min_tolerance: f64,
    pub max_tolerance: f64,
    /// Degrade once the consecutive failure count exceeds this.
    pub failure_threshold: u32,
    pub retry_cooldown_ms: u64,
    pub degrade_factor: f64,
    pub recovery_delay_ms: u64,
    pub settle_delay_ms: u64,
    pub settle_factor: f64,
    pub settle_floor: f64,
    pub settle_restore_ms: u64,
    pub manual_boost_factor: f64,
    pub manual_boost_floor: f64,
    pub manual_boost_restore_ms: u64,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            initial_tolerance: 32.0,
            min_tolerance: 4.0,
            max_tolerance: 64.0,
            failure_threshold: 5,
            retry_cooldown_ms: 5_000,
            degrade_factor: 2.0,
            recovery_delay_ms: 3_000,
            settle_delay_ms: 1_000,
            settle_factor: 0.5,
            settle_floor: 8.0,
            settle_restore_ms: 3_000,
            manual_boost_factor: 0.25,
            manual_boost_floor: 4.0,
            manual_boost_restore_ms: 2_000,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum TileHealth {
    Healthy,
    Degraded,
    Recovering,
}

/// Failure bookkeeping and the detail-error tolerance currently applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileLoadState {
    pub consecutive_failures: u32,
    pub last_retry: Option<Millis>,
    pub tolerance: f64,
    pub last_known_good: f64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BoostKind {
    CameraSettled,
    Manual,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ToleranceCause {
    Degraded,
    Recovered,
    Boost(BoostKind),
    BoostEnded,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ToleranceChange {
    pub from: f64,
    pub to: f64,
    pub cause: ToleranceCause,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum ResilienceTimer {
    Recover,
    CameraSettled,
    BoostRestore,
}

#[derive(Debug, Copy, Clone, PartialEq)]
struct ActiveBoost {
    kind: BoostKind,
    base: f64,
}

/// Adjusts the building tileset's maximum screen-space error around load failures.
///
/// Failure-driven degradation always wins over quality boosts: degrading
/// cancels any active or pending boost and starts from the boost's base
/// value, and boosts are ignored until the tileset is healthy again. A boost
/// triggered while one is active only re-arms the restore timer.
///
/// Time is passed in by the caller; [`TileResilienceManager::poll`] fires the
/// delayed restorations.
#[derive(Debug, Clone)]
pub struct TileResilienceManager {
    config: ResilienceConfig,
    health: TileHealth,
    state: TileLoadState,
    pre_degrade: f64,
    boost: Option<ActiveBoost>,
    timers: TimerSlots<ResilienceTimer>,
}

impl TileResilienceManager {
    pub fn new(config: ResilienceConfig) -> Self {
        let tolerance = config
            .initial_tolerance
            .clamp(config.min_tolerance, config.max_tolerance);
        Self {
            config,
            health: TileHealth::Healthy,
            state: TileLoadState {
                consecutive_failures: 0,
                last_retry: None,
                tolerance,
                last_known_good: tolerance,
            },
            pre_degrade: tolerance,
            boost: None,
            timers: TimerSlots::new(),
        }
    }

    pub fn health(&self) -> TileHealth {
        self.health
    }

    pub fn state(&self) -> &TileLoadState {
        &self.state
    }

    pub fn tolerance(&self) -> f64 {
        self.state.tolerance
    }

    pub fn is_boosted(&self) -> bool {
        self.boost.is_some()
    }

    /// Earliest pending restoration, for hosts that schedule their own wake-ups.
    pub fn next_deadline(&self) -> Option<Millis> {
        [
            ResilienceTimer::Recover,
            ResilienceTimer::CameraSettled,
            ResilienceTimer::BoostRestore,
        ]
        .into_iter()
        .filter_map(|t| self.timers.deadline(t))
        .min()
    }

    fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.config.min_tolerance, self.config.max_tolerance)
    }

    fn set_tolerance(&mut self, to: f64, cause: ToleranceCause) -> Option<ToleranceChange> {
        let from = self.state.tolerance;
        let to = self.clamp(to);
        self.state.tolerance = to;
        (from != to).then_some(ToleranceChange { from, to, cause })
    }

    pub fn on_tile_failed(&mut self, now: Millis) -> Option<ToleranceChange> {
        self.state.consecutive_failures = self.state.consecutive_failures.saturating_add(1);
        tracing::warn!(
            failures = self.state.consecutive_failures,
            tolerance = self.state.tolerance,
            "tile failed to load"
        );

        if self.health != TileHealth::Healthy
            || self.state.consecutive_failures <= self.config.failure_threshold
        {
            return None;
        }
        let cooled_down = self
            .state
            .last_retry
            .is_none_or(|last| now.since(last) > self.config.retry_cooldown_ms);
        if !cooled_down {
            return None;
        }
        self.degrade(now)
    }

    fn degrade(&mut self, now: Millis) -> Option<ToleranceChange> {
        let base = match self.boost.take() {
            Some(boost) => boost.base,
            None => self.state.tolerance,
        };
        self.timers.cancel(ResilienceTimer::BoostRestore);
        self.timers.cancel(ResilienceTimer::CameraSettled);

        self.pre_degrade = base;
        self.state.last_retry = Some(now);
        self.health = TileHealth::Degraded;
        self.timers
            .arm(ResilienceTimer::Recover, now.after(self.config.recovery_delay_ms));

        let degraded = (base * self.config.degrade_factor).min(self.config.max_tolerance);
        tracing::warn!(
            failures = self.state.consecutive_failures,
            from = base,
            to = degraded,
            "repeated tile failures, lowering detail"
        );
        // The change is reported against the value actually applied, which may be boosted.
        self.set_tolerance(degraded, ToleranceCause::Degraded)
    }

    /// A full-load pass completed: failure bookkeeping starts over.
    pub fn on_all_tiles_loaded(&mut self, _now: Millis) {
        self.state.consecutive_failures = 0;
        self.state.last_retry = None;
        if self.health == TileHealth::Healthy && self.boost.is_none() {
            self.state.last_known_good = self.state.tolerance;
        }
        tracing::debug!(tolerance = self.state.tolerance, "all visible tiles loaded");
    }

    /// Camera is moving again; a pending settle boost no longer applies.
    pub fn on_camera_moving(&mut self) {
        self.timers.cancel(ResilienceTimer::CameraSettled);
    }

    pub fn on_camera_move_end(&mut self, now: Millis) {
        self.timers.arm(
            ResilienceTimer::CameraSettled,
            now.after(self.config.settle_delay_ms),
        );
    }

    /// Temporary detail increase requested by the operator.
    pub fn force_detail_boost(&mut self, now: Millis) -> Option<ToleranceChange> {
        self.start_boost(BoostKind::Manual, now)
    }

    fn start_boost(&mut self, kind: BoostKind, now: Millis) -> Option<ToleranceChange> {
        if self.health != TileHealth::Healthy {
            tracing::debug!(?kind, health = ?self.health, "boost ignored while degraded");
            return None;
        }
        let (factor, floor, restore_ms) = match kind {
            BoostKind::CameraSettled => (
                self.config.settle_factor,
                self.config.settle_floor,
                self.config.settle_restore_ms,
            ),
            BoostKind::Manual => (
                self.config.manual_boost_factor,
                self.config.manual_boost_floor,
                self.config.manual_boost_restore_ms,
            ),
        };
        self.timers
            .arm(ResilienceTimer::BoostRestore, now.after(restore_ms));
        if self.boost.is_some() {
            return None;
        }

        let base = self.state.tolerance;
        self.boost = Some(ActiveBoost { kind, base });
        let boosted = (base * factor).max(floor);
        tracing::debug!(?kind, from = base, to = boosted, "detail boost");
        self.set_tolerance(boosted, ToleranceCause::Boost(kind))
    }

    fn end_boost(&mut self) -> Option<ToleranceChange> {
        let boost = self.boost.take()?;
        self.set_tolerance(boost.base, ToleranceCause::BoostEnded)
    }

    fn recover(&mut self) -> Option<ToleranceChange> {
        if self.health != TileHealth::Degraded {
            return None;
        }
        self.health = TileHealth::Recovering;
        let change = self.set_tolerance(self.pre_degrade, ToleranceCause::Recovered);
        self.state.consecutive_failures = 0;
        self.health = TileHealth::Healthy;
        tracing::info!(tolerance = self.state.tolerance, "tile loading recovered");
        change
    }

    /// Fires every restoration due at `now`, in deadline order.
    pub fn poll(&mut self, now: Millis) -> Vec<ToleranceChange> {
        let mut changes = Vec::new();
        while let Some(timer) = self.timers.pop_due(now) {
            let change = match timer {
                ResilienceTimer::Recover => self.recover(),
                ResilienceTimer::CameraSettled => self.start_boost(BoostKind::CameraSettled, now),
                ResilienceTimer::BoostRestore => self.end_boost(),
            };
            changes.extend(change);
        }
        changes
    }
}

impl Default for TileResilienceManager {
    fn default() -> Self {
        Self::new(ResilienceConfig::default())
    }
}
