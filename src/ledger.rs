//! Bankroll Ledger
//!
//! The single piece of shared mutable state in the crate: tracks the current
//! and peak bankroll, in-flight (allocated) capital, and the consecutive-loss
//! streak, and enforces the hard financial invariants:
//!
//! - allocated capital never exceeds `current * max_simultaneous_exposure`
//! - the bankroll never goes negative and the peak only grows
//! - outstanding ticket stakes always sum exactly to `allocated`
//! - a drawdown of 20% from peak halts the ledger until an explicit reset
//!
//! Every operation either fully applies its effect or fully fails; no
//! partial allocation or release is ever visible to callers. For concurrent
//! callers, [`SharedLedger`] serializes operations behind a mutex.

use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::models::{BetTicket, Outcome};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Ledger lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerStatus {
    Active,
    /// Entered when drawdown reaches the halt threshold; never exited
    /// automatically.
    Halted,
}

/// Why a quote came back reduced or zeroed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CannotBet {
    /// Drawdown circuit breaker is engaged.
    Halted,
    /// The requested Kelly fraction carries no positive stake.
    NoEdge,
    /// The exposure cap leaves no headroom for a new bet.
    ExposureCapReached,
    /// The consecutive-loss throttle halved the stake.
    LossStreakThrottle,
}

impl fmt::Display for CannotBet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CannotBet::Halted => write!(f, "ledger halted"),
            CannotBet::NoEdge => write!(f, "no edge"),
            CannotBet::ExposureCapReached => write!(f, "exposure cap reached"),
            CannotBet::LossStreakThrottle => write!(f, "loss streak throttle"),
        }
    }
}

/// A proposed stake with the reason it was reduced or refused, if any.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub stake: f64,
    pub reason: Option<CannotBet>,
}

/// Result of settling one ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementReport {
    pub ticket_id: String,
    pub outcome: Outcome,
    pub stake: f64,
    pub payout: f64,
    pub profit: f64,
    pub bankroll_after: f64,
    pub allocated_after: f64,
    pub drawdown: f64,
    pub consecutive_losses: u32,
    pub halted: bool,
}

/// Stateful bankroll manager. Created once per session; mutated only through
/// [`allocate`](Self::allocate) and [`settle`](Self::settle).
#[derive(Debug, Clone)]
pub struct BankrollLedger {
    initial: f64,
    current: f64,
    peak: f64,
    allocated: f64,
    consecutive_losses: u32,
    status: LedgerStatus,
    outstanding: BTreeMap<String, BetTicket>,
    config: LedgerConfig,
}

impl BankrollLedger {
    pub fn new(initial: f64, config: LedgerConfig) -> Self {
        Self {
            initial,
            current: initial,
            peak: initial,
            allocated: 0.0,
            consecutive_losses: 0,
            status: LedgerStatus::Active,
            outstanding: BTreeMap::new(),
            config,
        }
    }

    pub fn with_defaults(initial: f64) -> Self {
        Self::new(initial, LedgerConfig::default())
    }

    pub fn initial(&self) -> f64 {
        self.initial
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn peak(&self) -> f64 {
        self.peak
    }

    pub fn allocated(&self) -> f64 {
        self.allocated
    }

    pub fn consecutive_losses(&self) -> u32 {
        self.consecutive_losses
    }

    pub fn status(&self) -> LedgerStatus {
        self.status
    }

    pub fn outstanding_count(&self) -> usize {
        self.outstanding.len()
    }

    /// Current drawdown from peak, in [0, 1].
    pub fn drawdown(&self) -> f64 {
        if self.peak > 0.0 {
            (self.peak - self.current) / self.peak
        } else {
            0.0
        }
    }

    /// Remaining capital headroom under the exposure cap.
    fn headroom(&self) -> f64 {
        (self.current * self.config.max_simultaneous_exposure - self.allocated).max(0.0)
    }

    /// Propose a stake for a Kelly fraction of the current bankroll, subject
    /// to the per-bet cap, the exposure cap, and the loss-streak throttle.
    ///
    /// Never mutates the ledger.
    pub fn quote(&self, kelly_fraction: f64) -> Quote {
        if self.status == LedgerStatus::Halted {
            return Quote {
                stake: 0.0,
                reason: Some(CannotBet::Halted),
            };
        }

        if kelly_fraction <= 0.0 {
            return Quote {
                stake: 0.0,
                reason: Some(CannotBet::NoEdge),
            };
        }

        // The throttle halves the stake before the caps apply; it reduces
        // rather than refuses.
        let mut reason = None;
        let mut fraction = kelly_fraction;
        if self.consecutive_losses >= self.config.consecutive_loss_threshold {
            fraction /= 2.0;
            reason = Some(CannotBet::LossStreakThrottle);
        }

        let stake = (fraction * self.current)
            .min(self.current * self.config.max_bet_percentage)
            .min(self.headroom());

        if stake <= 0.0 {
            return Quote {
                stake: 0.0,
                reason: Some(CannotBet::ExposureCapReached),
            };
        }

        Quote { stake, reason }
    }

    /// Reserve capital for a ticket. Fails without any state change when the
    /// ledger is halted, the stake is not a positive finite amount, the id is
    /// already outstanding, or the stake exceeds the exposure headroom.
    pub fn allocate(&mut self, ticket: BetTicket) -> Result<(), LedgerError> {
        if self.status == LedgerStatus::Halted {
            return Err(LedgerError::Halted);
        }
        if !ticket.stake.is_finite() || ticket.stake <= 0.0 {
            return Err(LedgerError::InvalidStake {
                stake: ticket.stake,
            });
        }
        if self.outstanding.contains_key(&ticket.id) {
            return Err(LedgerError::DuplicateTicket(ticket.id));
        }
        let headroom = self.headroom();
        if ticket.stake > headroom {
            return Err(LedgerError::InsufficientCapital {
                requested: ticket.stake,
                available: headroom,
            });
        }

        self.allocated += ticket.stake;
        self.outstanding.insert(ticket.id.clone(), ticket);
        Ok(())
    }

    /// Settle an outstanding ticket. Releases its stake, applies the outcome
    /// to the bankroll, updates the loss streak and peak, and engages the
    /// drawdown halt when the threshold is crossed.
    ///
    /// `payout` is the gross return on a win (stake times decimal odds); it
    /// is ignored for losses and pushes.
    ///
    /// The only failure is an unknown ticket id, checked before any
    /// mutation, so a settle can never release capital without applying the
    /// bankroll change or vice versa.
    pub fn settle(
        &mut self,
        ticket_id: &str,
        outcome: Outcome,
        payout: f64,
    ) -> Result<SettlementReport, LedgerError> {
        let ticket = self
            .outstanding
            .remove(ticket_id)
            .ok_or_else(|| LedgerError::UnknownTicket(ticket_id.to_string()))?;

        self.allocated = (self.allocated - ticket.stake).max(0.0);

        let profit = match outcome {
            Outcome::Win => {
                self.consecutive_losses = 0;
                let profit = payout - ticket.stake;
                self.current += profit;
                profit
            }
            Outcome::Loss => {
                self.consecutive_losses += 1;
                self.current -= ticket.stake;
                -ticket.stake
            }
            Outcome::Push => 0.0,
        };
        self.current = self.current.max(0.0);
        self.peak = self.peak.max(self.current);

        let drawdown = self.drawdown();
        if drawdown >= self.config.drawdown_halt_threshold && self.status == LedgerStatus::Active {
            self.status = LedgerStatus::Halted;
            warn!(
                drawdown = format!("{:.1}%", drawdown * 100.0),
                bankroll = self.current,
                peak = self.peak,
                "drawdown halt engaged"
            );
        }

        Ok(SettlementReport {
            ticket_id: ticket_id.to_string(),
            outcome,
            stake: ticket.stake,
            payout: match outcome {
                Outcome::Win => payout,
                Outcome::Loss => 0.0,
                Outcome::Push => ticket.stake,
            },
            profit,
            bankroll_after: self.current,
            allocated_after: self.allocated,
            drawdown,
            consecutive_losses: self.consecutive_losses,
            halted: self.status == LedgerStatus::Halted,
        })
    }

    /// Explicitly exit the halted state. Rebases the peak to the current
    /// bankroll (a stale peak would re-halt on the next settle) and clears
    /// the loss streak.
    pub fn reset(&mut self) {
        info!(bankroll = self.current, "ledger reset; halt cleared");
        self.status = LedgerStatus::Active;
        self.peak = self.current;
        self.consecutive_losses = 0;
    }

    /// Sum of outstanding ticket stakes; equals `allocated` at all times.
    pub fn outstanding_stakes(&self) -> f64 {
        self.outstanding.values().map(|t| t.stake).sum()
    }
}

/// Mutex-guarded ledger for concurrent callers. One ledger owns its state;
/// quote, allocate and settle are serialized against each other, which is
/// all the invariants need since they span every field jointly.
#[derive(Debug, Clone)]
pub struct SharedLedger(Arc<Mutex<BankrollLedger>>);

impl SharedLedger {
    pub fn new(ledger: BankrollLedger) -> Self {
        Self(Arc::new(Mutex::new(ledger)))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BankrollLedger> {
        // A poisoned mutex means a panic mid-operation; the ledger mutates
        // only after validation, so the state is still consistent.
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn quote(&self, kelly_fraction: f64) -> Quote {
        self.lock().quote(kelly_fraction)
    }

    pub fn allocate(&self, ticket: BetTicket) -> Result<(), LedgerError> {
        self.lock().allocate(ticket)
    }

    pub fn settle(
        &self,
        ticket_id: &str,
        outcome: Outcome,
        payout: f64,
    ) -> Result<SettlementReport, LedgerError> {
        self.lock().settle(ticket_id, outcome, payout)
    }

    pub fn reset(&self) {
        self.lock().reset()
    }

    pub fn current(&self) -> f64 {
        self.lock().current()
    }

    pub fn allocated(&self) -> f64 {
        self.lock().allocated()
    }

    pub fn status(&self) -> LedgerStatus {
        self.lock().status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Odds;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn ticket(id: &str, stake: f64) -> BetTicket {
        BetTicket::new(id, stake, Odds::American(-110))
    }

    fn assert_invariants(ledger: &BankrollLedger) {
        assert!(ledger.current() >= 0.0);
        assert!(ledger.peak() >= ledger.current());
        assert!(ledger.allocated() >= -1e-9);
        assert!(
            (ledger.allocated() - ledger.outstanding_stakes()).abs() < 1e-6,
            "allocated {} != outstanding {}",
            ledger.allocated(),
            ledger.outstanding_stakes()
        );
    }

    #[test]
    fn test_exposure_cap_rejects_over_allocation() {
        // 10_000 bankroll at 25% exposure: 2000 fits, 600 more does not.
        let mut ledger = BankrollLedger::with_defaults(10_000.0);

        assert!(ledger.allocate(ticket("a", 2000.0)).is_ok());
        let err = ledger.allocate(ticket("b", 600.0)).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientCapital {
                requested: 600.0,
                available: 500.0,
            }
        );
        assert_eq!(ledger.allocated(), 2000.0);
        assert_eq!(ledger.outstanding_count(), 1);
        assert_invariants(&ledger);
    }

    #[test]
    fn test_non_positive_and_non_finite_stakes_rejected() {
        // A negative stake would slide under the headroom check and drive
        // `allocated` negative; it must fail typed, leaving no trace.
        let mut ledger = BankrollLedger::with_defaults(10_000.0);

        for bad in [-100.0, 0.0, f64::NAN, f64::INFINITY] {
            let err = ledger.allocate(ticket("a", bad)).unwrap_err();
            assert!(
                matches!(err, LedgerError::InvalidStake { .. }),
                "stake {} gave {:?}",
                bad,
                err
            );
        }
        assert_eq!(ledger.allocated(), 0.0);
        assert_eq!(ledger.outstanding_count(), 0);
        assert_invariants(&ledger);
    }

    #[test]
    fn test_duplicate_ticket_rejected() {
        let mut ledger = BankrollLedger::with_defaults(10_000.0);
        ledger.allocate(ticket("a", 100.0)).unwrap();
        let err = ledger.allocate(ticket("a", 100.0)).unwrap_err();
        assert_eq!(err, LedgerError::DuplicateTicket("a".to_string()));
        assert_eq!(ledger.allocated(), 100.0);
    }

    #[test]
    fn test_settle_win_loss_push() {
        let mut ledger = BankrollLedger::with_defaults(10_000.0);

        ledger.allocate(ticket("w", 100.0)).unwrap();
        let report = ledger.settle("w", Outcome::Win, 190.9).unwrap();
        assert!((report.profit - 90.9).abs() < 1e-9);
        assert!((ledger.current() - 10_090.9).abs() < 1e-9);
        assert_eq!(ledger.consecutive_losses(), 0);

        ledger.allocate(ticket("l", 100.0)).unwrap();
        let report = ledger.settle("l", Outcome::Loss, 0.0).unwrap();
        assert_eq!(report.profit, -100.0);
        assert!((ledger.current() - 9_990.9).abs() < 1e-9);
        assert_eq!(ledger.consecutive_losses(), 1);

        ledger.allocate(ticket("p", 100.0)).unwrap();
        let before = ledger.current();
        let report = ledger.settle("p", Outcome::Push, 0.0).unwrap();
        assert_eq!(report.profit, 0.0);
        assert_eq!(ledger.current(), before);
        assert_eq!(ledger.consecutive_losses(), 1); // unchanged on push

        assert_eq!(ledger.allocated(), 0.0);
        assert_invariants(&ledger);
    }

    #[test]
    fn test_settle_unknown_ticket() {
        let mut ledger = BankrollLedger::with_defaults(10_000.0);
        let err = ledger.settle("ghost", Outcome::Win, 100.0).unwrap_err();
        assert_eq!(err, LedgerError::UnknownTicket("ghost".to_string()));
        assert_eq!(ledger.current(), 10_000.0);
    }

    #[test]
    fn test_settle_called_once_per_allocate() {
        let mut ledger = BankrollLedger::with_defaults(10_000.0);
        ledger.allocate(ticket("a", 100.0)).unwrap();
        ledger.settle("a", Outcome::Win, 200.0).unwrap();
        assert!(ledger.settle("a", Outcome::Win, 200.0).is_err());
        // The id is free again after settlement.
        assert!(ledger.allocate(ticket("a", 100.0)).is_ok());
    }

    #[test]
    fn test_drawdown_halt() {
        // Three losses take 10_000 to 7_900: 21% drawdown, past the 20%
        // threshold.
        let mut ledger = BankrollLedger::with_defaults(10_000.0);

        for (id, stake) in [("a", 700.0), ("b", 700.0), ("c", 700.0)] {
            ledger.allocate(ticket(id, stake)).unwrap();
            ledger.settle(id, Outcome::Loss, 0.0).unwrap();
        }

        assert!((ledger.current() - 7_900.0).abs() < 1e-9);
        assert!(ledger.drawdown() >= 0.20);
        assert_eq!(ledger.status(), LedgerStatus::Halted);

        let quote = ledger.quote(0.05);
        assert_eq!(quote.stake, 0.0);
        assert_eq!(quote.reason, Some(CannotBet::Halted));
    }

    #[test]
    fn test_halt_is_monotonic_until_reset() {
        let mut ledger = BankrollLedger::with_defaults(10_000.0);
        ledger.allocate(ticket("a", 2500.0)).unwrap();
        ledger.settle("a", Outcome::Loss, 0.0).unwrap();
        assert_eq!(ledger.status(), LedgerStatus::Halted);

        for _ in 0..5 {
            assert_eq!(ledger.quote(0.10).stake, 0.0);
        }
        assert_eq!(ledger.allocate(ticket("b", 10.0)).unwrap_err(), LedgerError::Halted);

        ledger.reset();
        assert_eq!(ledger.status(), LedgerStatus::Active);
        assert_eq!(ledger.peak(), ledger.current());
        assert!(ledger.quote(0.10).stake > 0.0);
    }

    #[test]
    fn test_quote_caps() {
        let ledger = BankrollLedger::with_defaults(10_000.0);

        // Per-bet cap: 5% of 10_000.
        let quote = ledger.quote(0.50);
        assert!((quote.stake - 500.0).abs() < 1e-9);
        assert_eq!(quote.reason, None);

        // Below the cap the raw fraction passes through.
        let quote = ledger.quote(0.01);
        assert!((quote.stake - 100.0).abs() < 1e-9);

        // No edge.
        let quote = ledger.quote(0.0);
        assert_eq!(quote.stake, 0.0);
        assert_eq!(quote.reason, Some(CannotBet::NoEdge));
    }

    #[test]
    fn test_quote_headroom_exhausted() {
        let mut ledger = BankrollLedger::with_defaults(10_000.0);
        ledger.allocate(ticket("a", 2500.0)).unwrap();
        let quote = ledger.quote(0.05);
        assert_eq!(quote.stake, 0.0);
        assert_eq!(quote.reason, Some(CannotBet::ExposureCapReached));
    }

    #[test]
    fn test_loss_streak_throttle_halves() {
        let mut ledger = BankrollLedger::new(
            10_000.0,
            LedgerConfig {
                consecutive_loss_threshold: 3,
                // Wide drawdown limit so the streak, not the halt, is tested.
                drawdown_halt_threshold: 0.90,
                ..LedgerConfig::default()
            },
        );

        for id in ["a", "b", "c"] {
            ledger.allocate(ticket(id, 50.0)).unwrap();
            ledger.settle(id, Outcome::Loss, 0.0).unwrap();
        }
        assert_eq!(ledger.consecutive_losses(), 3);

        let throttled = ledger.quote(0.02);
        assert_eq!(throttled.reason, Some(CannotBet::LossStreakThrottle));
        assert!((throttled.stake - 0.01 * ledger.current()).abs() < 1e-6);

        // A win clears the streak.
        ledger.allocate(ticket("d", throttled.stake)).unwrap();
        ledger.settle("d", Outcome::Win, throttled.stake * 2.0).unwrap();
        assert_eq!(ledger.consecutive_losses(), 0);
        assert_eq!(ledger.quote(0.02).reason, None);
    }

    #[test]
    fn test_conservation_under_random_sequences() {
        // Random allocate/settle interleavings: allocated must equal the sum
        // of outstanding stakes and never exceed the exposure cap at every
        // step.
        let mut rng = StdRng::seed_from_u64(7);

        for round in 0..50 {
            let mut ledger = BankrollLedger::with_defaults(10_000.0);
            let mut live: Vec<String> = Vec::new();
            let mut next_id = 0usize;

            for _ in 0..200 {
                if rng.gen_bool(0.5) && ledger.status() == LedgerStatus::Active {
                    let stake = rng.gen_range(1.0..1500.0);
                    let id = format!("r{}-t{}", round, next_id);
                    next_id += 1;
                    if ledger.allocate(ticket(&id, stake)).is_ok() {
                        live.push(id);
                    }
                } else if !live.is_empty() {
                    let idx = rng.gen_range(0..live.len());
                    let id = live.swap_remove(idx);
                    let outcome = match rng.gen_range(0..10) {
                        0..=4 => Outcome::Win,
                        5..=8 => Outcome::Loss,
                        _ => Outcome::Push,
                    };
                    let payout = match outcome {
                        Outcome::Win => rng.gen_range(1.0..3000.0),
                        _ => 0.0,
                    };
                    ledger.settle(&id, outcome, payout).unwrap();
                }

                assert_invariants(&ledger);
            }
        }
    }

    #[test]
    fn test_no_over_allocation_at_allocate_time() {
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..100 {
            let mut ledger = BankrollLedger::with_defaults(rng.gen_range(1000.0..100_000.0));
            let cap = ledger.current() * 0.25;
            let mut accepted = 0.0;

            for i in 0..50 {
                let stake = rng.gen_range(1.0..cap);
                if ledger.allocate(ticket(&format!("t{}", i), stake)).is_ok() {
                    accepted += stake;
                }
                assert!(ledger.allocated() <= cap + 1e-6);
                assert!((ledger.allocated() - accepted).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_failed_operations_leave_state_unchanged() {
        let mut ledger = BankrollLedger::with_defaults(10_000.0);
        ledger.allocate(ticket("a", 2000.0)).unwrap();

        let before_current = ledger.current();
        let before_allocated = ledger.allocated();
        let before_outstanding = ledger.outstanding_count();

        assert!(ledger.allocate(ticket("a", 100.0)).is_err());
        assert!(ledger.allocate(ticket("b", 9000.0)).is_err());
        assert!(ledger.settle("missing", Outcome::Loss, 0.0).is_err());

        assert_eq!(ledger.current(), before_current);
        assert_eq!(ledger.allocated(), before_allocated);
        assert_eq!(ledger.outstanding_count(), before_outstanding);
    }

    #[test]
    fn test_shared_ledger_concurrent_allocates_respect_cap() {
        use std::thread;

        let shared = SharedLedger::new(BankrollLedger::with_defaults(10_000.0));
        let mut handles = Vec::new();

        // 40 threads each trying to allocate 200: at most 12 can fit under
        // the 2500 exposure cap.
        for i in 0..40 {
            let ledger = shared.clone();
            handles.push(thread::spawn(move || {
                ledger
                    .allocate(BetTicket::new(
                        &format!("t{}", i),
                        200.0,
                        Odds::American(-110),
                    ))
                    .is_ok()
            }));
        }

        let accepted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(accepted, 12);
        assert!((shared.allocated() - 2400.0).abs() < 1e-9);
    }
}
