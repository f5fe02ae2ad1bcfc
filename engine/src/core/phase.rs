//! Phase state machine shared by every task engine.
//!
//! A session is a fixed, ordered plan of task-local phases. Countdown
//! ticks (1 Hz) and sampling ticks arrive as external events; the
//! controller never owns a timer. A phase ends when its bound is
//! reached or the caller completes it explicitly, whichever happens
//! first. Once the plan is exhausted the controller is terminal and all
//! further events are ignored.

use serde::Serialize;
use std::fmt::Debug;
use tracing::debug;

/// What ends a phase: a countdown reaching zero, the last trial being
/// answered, or an explicit completion signal from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseBound {
    Seconds(u32),
    Trials(usize),
    Manual,
}

/// One step of a task's fixed phase order.
#[derive(Debug, Clone, Copy)]
pub struct PhaseStep<P> {
    pub phase: P,
    pub bound: PhaseBound,
}

impl<P> PhaseStep<P> {
    pub fn seconds(phase: P, duration_s: u32) -> Self {
        Self {
            phase,
            bound: PhaseBound::Seconds(duration_s),
        }
    }

    pub fn trials(phase: P, count: usize) -> Self {
        Self {
            phase,
            bound: PhaseBound::Trials(count),
        }
    }

    pub fn manual(phase: P) -> Self {
        Self {
            phase,
            bound: PhaseBound::Manual,
        }
    }
}

/// Counters a phase may accumulate. Unused counters stay at zero and
/// serialize alongside the phase record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PhaseCounters {
    pub steps: u32,
    pub blinks: u32,
    pub taps: u32,
    pub toggles: u32,
}

/// Snapshot of a finished phase, copied into the session log when the
/// controller moves past it. Immutable from then on.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseRecord<P> {
    pub phase: P,
    pub bound: PhaseBound,
    pub elapsed_seconds: u32,
    pub samples: u32,
    pub counters: PhaseCounters,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerStatus {
    Running,
    Completed,
    Cancelled,
}

/// Result of delivering an event to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition<P> {
    /// The current phase continues.
    Stay,
    /// The controller moved into a new phase.
    Entered(P),
    /// The plan is exhausted; the session is complete.
    Completed,
    /// Event arrived after the terminal state; nothing changed.
    Ignored,
}

#[derive(Debug, Clone)]
pub struct PhaseController<P> {
    steps: Vec<PhaseStep<P>>,
    cursor: usize,
    status: ControllerStatus,
    seconds_in_phase: u32,
    samples_in_phase: u32,
    trials_left: usize,
    counters: PhaseCounters,
    log: Vec<PhaseRecord<P>>,
}

impl<P: Copy + Eq + Debug + Serialize> PhaseController<P> {
    /// Builds a controller over a non-empty phase plan; the first phase
    /// is active immediately.
    pub fn new(steps: Vec<PhaseStep<P>>) -> Self {
        debug_assert!(!steps.is_empty(), "phase plan must not be empty");
        let trials_left = match steps.first().map(|s| s.bound) {
            Some(PhaseBound::Trials(n)) => n,
            _ => 0,
        };
        Self {
            steps,
            cursor: 0,
            status: ControllerStatus::Running,
            seconds_in_phase: 0,
            samples_in_phase: 0,
            trials_left,
            counters: PhaseCounters::default(),
            log: Vec::new(),
        }
    }

    pub fn status(&self) -> ControllerStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == ControllerStatus::Running
    }

    pub fn is_completed(&self) -> bool {
        self.status == ControllerStatus::Completed
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == ControllerStatus::Cancelled
    }

    /// Active phase, `None` once terminal.
    pub fn current(&self) -> Option<P> {
        if self.is_running() {
            self.steps.get(self.cursor).map(|s| s.phase)
        } else {
            None
        }
    }

    /// Seconds left in a countdown-bounded phase.
    pub fn time_remaining(&self) -> Option<u32> {
        let step = self.steps.get(self.cursor)?;
        if !self.is_running() {
            return None;
        }
        match step.bound {
            PhaseBound::Seconds(d) => Some(d.saturating_sub(self.seconds_in_phase)),
            _ => None,
        }
    }

    pub fn seconds_in_phase(&self) -> u32 {
        self.seconds_in_phase
    }

    pub fn samples_in_phase(&self) -> u32 {
        self.samples_in_phase
    }

    /// Mutable access to the active phase's counters; `None` once the
    /// controller is terminal, so frozen sessions cannot be mutated.
    pub fn counters_mut(&mut self) -> Option<&mut PhaseCounters> {
        if self.is_running() {
            Some(&mut self.counters)
        } else {
            None
        }
    }

    pub fn counters(&self) -> PhaseCounters {
        self.counters
    }

    /// Completed-phase log, in execution order.
    pub fn log(&self) -> &[PhaseRecord<P>] {
        &self.log
    }

    /// Delivers a 1 Hz countdown tick. The transition out of a
    /// countdown phase happens exactly once, on the tick that brings
    /// `time_remaining` to zero.
    pub fn on_second_tick(&mut self) -> Transition<P> {
        if !self.is_running() {
            return Transition::Ignored;
        }
        self.seconds_in_phase = self.seconds_in_phase.saturating_add(1);
        match self.steps[self.cursor].bound {
            PhaseBound::Seconds(d) if self.seconds_in_phase >= d => self.advance(),
            _ => Transition::Stay,
        }
    }

    /// Delivers a sampling tick; returns whether the session accepts a
    /// sample right now. Cancelled or completed sessions refuse.
    pub fn on_sample_tick(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.samples_in_phase = self.samples_in_phase.saturating_add(1);
        true
    }

    /// Marks one trial of a trial-bounded phase as finished.
    pub fn on_trial_finished(&mut self) -> Transition<P> {
        if !self.is_running() {
            return Transition::Ignored;
        }
        match self.steps[self.cursor].bound {
            PhaseBound::Trials(_) => {
                self.trials_left = self.trials_left.saturating_sub(1);
                if self.trials_left == 0 {
                    self.advance()
                } else {
                    Transition::Stay
                }
            }
            _ => Transition::Stay,
        }
    }

    /// Explicit external completion of the current phase ("stop
    /// recording", instructions acknowledged). Idempotent once the
    /// controller is terminal.
    pub fn complete_phase(&mut self) -> Transition<P> {
        if !self.is_running() {
            return Transition::Ignored;
        }
        self.advance()
    }

    /// Abandons the session: the log freezes as-is, the active phase is
    /// discarded, and every later event is ignored.
    pub fn cancel(&mut self) {
        if self.is_running() {
            debug!(phase = ?self.current(), "session cancelled");
            self.status = ControllerStatus::Cancelled;
        }
    }

    fn advance(&mut self) -> Transition<P> {
        let step = self.steps[self.cursor];
        self.log.push(PhaseRecord {
            phase: step.phase,
            bound: step.bound,
            elapsed_seconds: self.seconds_in_phase,
            samples: self.samples_in_phase,
            counters: self.counters,
        });

        self.cursor += 1;
        self.seconds_in_phase = 0;
        self.samples_in_phase = 0;
        self.counters = PhaseCounters::default();

        match self.steps.get(self.cursor) {
            Some(next) => {
                self.trials_left = match next.bound {
                    PhaseBound::Trials(n) => n,
                    _ => 0,
                };
                debug!(from = ?step.phase, to = ?next.phase, "phase transition");
                Transition::Entered(next.phase)
            }
            None => {
                self.status = ControllerStatus::Completed;
                debug!(last = ?step.phase, "session completed");
                Transition::Completed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    #[serde(rename_all = "snake_case")]
    enum TestPhase {
        Instructions,
        Work,
        Cooldown,
    }

    fn controller() -> PhaseController<TestPhase> {
        PhaseController::new(vec![
            PhaseStep::manual(TestPhase::Instructions),
            PhaseStep::seconds(TestPhase::Work, 3),
            PhaseStep::seconds(TestPhase::Cooldown, 2),
        ])
    }

    #[test]
    fn countdown_transition_fires_exactly_once_at_zero() {
        let mut ctl = controller();
        assert_eq!(ctl.complete_phase(), Transition::Entered(TestPhase::Work));

        assert_eq!(ctl.on_second_tick(), Transition::Stay);
        assert_eq!(ctl.time_remaining(), Some(2));
        assert_eq!(ctl.on_second_tick(), Transition::Stay);
        assert_eq!(
            ctl.on_second_tick(),
            Transition::Entered(TestPhase::Cooldown)
        );

        let work = &ctl.log()[1];
        assert_eq!(work.elapsed_seconds, 3);
    }

    #[test]
    fn explicit_completion_preempts_countdown() {
        let mut ctl = controller();
        ctl.complete_phase();
        ctl.on_second_tick();
        assert_eq!(
            ctl.complete_phase(),
            Transition::Entered(TestPhase::Cooldown)
        );
        assert_eq!(ctl.log()[1].elapsed_seconds, 1);
    }

    #[test]
    fn terminal_state_is_idempotent() {
        let mut ctl = controller();
        ctl.complete_phase();
        for _ in 0..3 {
            ctl.on_second_tick();
        }
        assert_eq!(ctl.on_second_tick(), Transition::Stay);
        assert_eq!(ctl.on_second_tick(), Transition::Completed);
        assert!(ctl.is_completed());

        assert_eq!(ctl.complete_phase(), Transition::Ignored);
        assert_eq!(ctl.on_second_tick(), Transition::Ignored);
        assert!(!ctl.on_sample_tick());
        assert_eq!(ctl.log().len(), 3);
    }

    #[test]
    fn trial_bound_advances_after_last_trial() {
        let mut ctl = PhaseController::new(vec![
            PhaseStep::trials(TestPhase::Work, 2),
            PhaseStep::manual(TestPhase::Cooldown),
        ]);
        assert_eq!(ctl.on_trial_finished(), Transition::Stay);
        assert_eq!(
            ctl.on_trial_finished(),
            Transition::Entered(TestPhase::Cooldown)
        );
    }

    #[test]
    fn cancel_freezes_log_and_counters() {
        let mut ctl = controller();
        ctl.complete_phase();
        ctl.on_sample_tick();
        ctl.counters_mut().unwrap().steps += 1;
        ctl.cancel();

        assert!(ctl.is_cancelled());
        assert!(ctl.counters_mut().is_none());
        assert!(!ctl.on_sample_tick());
        assert_eq!(ctl.on_second_tick(), Transition::Ignored);
        // Only the acknowledged instructions phase made it into the log.
        assert_eq!(ctl.log().len(), 1);
    }

    #[test]
    fn counters_reset_per_phase() {
        let mut ctl = controller();
        ctl.counters_mut().unwrap().taps = 5;
        ctl.complete_phase();
        assert_eq!(ctl.counters().taps, 0);
        assert_eq!(ctl.log()[0].counters.taps, 5);
    }
}
