//! Session engine for the gait / freezing-of-gait protocol.
//!
//! Fixed phase order: calibration → walking outbound → turn → walking
//! return → start-stop. Countdown ticks drive the phase plan; sampling
//! ticks pull one reading from the sensor source and append it to the
//! active phase's log. Steps accumulate on the phase counters during
//! the walking phases, start/stop toggles during the final task.

use serde::Serialize;
use tracing::debug;

use crate::core::error::EngineError;
use crate::core::phase::{PhaseController, PhaseStep, Transition};
use crate::core::qc::QualityFlags;
use crate::core::rng::SessionRng;
use crate::core::timing::InstantStamp;
use crate::results::SummaryRecord;

use super::metrics::GaitMetrics;
use super::sensor::{Emission, ImuProfile, ImuSample, SampleContext, SensorSource, SyntheticImu};

#[derive(Debug, Clone)]
pub struct GaitConfig {
    pub calibration_duration_s: u32,
    pub walking_duration_s: u32,
    pub turn_duration_s: u32,
    pub start_stop_duration_s: u32,
    pub sampling_rate_hz: u32,
    pub profile: ImuProfile,
}

impl Default for GaitConfig {
    fn default() -> Self {
        Self {
            calibration_duration_s: 3,
            walking_duration_s: 10,
            turn_duration_s: 5,
            start_stop_duration_s: 10,
            sampling_rate_hz: 50,
            profile: ImuProfile::default(),
        }
    }
}

impl GaitConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.sampling_rate_hz == 0 {
            return Err(EngineError::invalid_config(
                "sampling_rate_hz",
                0.0,
                "must be positive",
            ));
        }
        if self.walking_duration_s == 0 {
            return Err(EngineError::invalid_config(
                "walking_duration_s",
                0.0,
                "must be positive",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GaitPhase {
    Instructions,
    Calibration,
    WalkingOutbound,
    Turn,
    WalkingReturn,
    StartStop,
}

impl GaitPhase {
    pub fn slug(self) -> &'static str {
        match self {
            GaitPhase::Instructions => "instructions",
            GaitPhase::Calibration => "calibration",
            GaitPhase::WalkingOutbound => "walking_outbound",
            GaitPhase::Turn => "turn",
            GaitPhase::WalkingReturn => "walking_return",
            GaitPhase::StartStop => "start_stop",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GaitOutcome {
    PhaseEntered(GaitPhase),
    Stay,
    RunCompleted,
    Ignored,
}

pub struct GaitEngine {
    pub config: GaitConfig,
    controller: PhaseController<GaitPhase>,
    source: Box<dyn SensorSource>,
    calibration_samples: Vec<ImuSample>,
    outbound_samples: Vec<ImuSample>,
    turn_samples: Vec<ImuSample>,
    return_samples: Vec<ImuSample>,
    start_stop_samples: Vec<ImuSample>,
    /// User-toggled walking state for the start-stop task.
    user_walking: bool,
    qc: QualityFlags,
}

impl GaitEngine {
    /// Engine over the synthetic emitter, seeded from the session RNG.
    pub fn new(config: GaitConfig, rng: SessionRng) -> Result<Self, EngineError> {
        let source = Box::new(SyntheticImu::new(
            config.profile.clone(),
            config.sampling_rate_hz,
            rng,
        ));
        Self::with_source(config, source)
    }

    /// Engine over an arbitrary source; the seam a hardware adapter
    /// plugs into.
    pub fn with_source(
        config: GaitConfig,
        source: Box<dyn SensorSource>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let plan = vec![
            PhaseStep::manual(GaitPhase::Instructions),
            PhaseStep::seconds(GaitPhase::Calibration, config.calibration_duration_s),
            PhaseStep::seconds(GaitPhase::WalkingOutbound, config.walking_duration_s),
            PhaseStep::seconds(GaitPhase::Turn, config.turn_duration_s),
            PhaseStep::seconds(GaitPhase::WalkingReturn, config.walking_duration_s),
            PhaseStep::seconds(GaitPhase::StartStop, config.start_stop_duration_s),
        ];
        Ok(Self {
            controller: PhaseController::new(plan),
            source,
            calibration_samples: Vec::new(),
            outbound_samples: Vec::new(),
            turn_samples: Vec::new(),
            return_samples: Vec::new(),
            start_stop_samples: Vec::new(),
            user_walking: false,
            qc: QualityFlags::pristine(),
            config,
        })
    }

    pub fn phase(&self) -> Option<GaitPhase> {
        self.controller.current()
    }

    pub fn is_completed(&self) -> bool {
        self.controller.is_completed()
    }

    pub fn qc(&self) -> &QualityFlags {
        &self.qc
    }

    pub fn time_remaining(&self) -> Option<u32> {
        self.controller.time_remaining()
    }

    pub fn samples_in_phase(&self) -> u32 {
        self.controller.samples_in_phase()
    }

    pub fn acknowledge_instructions(&mut self) -> GaitOutcome {
        if self.controller.current() != Some(GaitPhase::Instructions) {
            return GaitOutcome::Ignored;
        }
        let transition = self.controller.complete_phase();
        self.map_transition(transition)
    }

    /// 1 Hz countdown tick.
    pub fn on_second_tick(&mut self) -> GaitOutcome {
        let transition = self.controller.on_second_tick();
        self.map_transition(transition)
    }

    /// Sampling tick: pulls one reading from the source and appends it
    /// to the active phase. Ticks after cancellation or completion are
    /// dropped.
    pub fn on_sample_tick(&mut self, timestamp: InstantStamp) -> Option<ImuSample> {
        let phase = self.controller.current()?;
        if phase == GaitPhase::Instructions || !self.controller.on_sample_tick() {
            return None;
        }

        let walking = match phase {
            GaitPhase::WalkingOutbound | GaitPhase::WalkingReturn => true,
            GaitPhase::StartStop => self.user_walking,
            _ => false,
        };
        let Emission { sample, step } = self.source.sample(SampleContext {
            phase,
            t_ms: timestamp,
            walking,
        });

        if step && walking {
            if let Some(counters) = self.controller.counters_mut() {
                counters.steps = counters.steps.saturating_add(1);
            }
        }

        match phase {
            GaitPhase::Calibration => self.calibration_samples.push(sample),
            GaitPhase::WalkingOutbound => self.outbound_samples.push(sample),
            GaitPhase::Turn => self.turn_samples.push(sample),
            GaitPhase::WalkingReturn => self.return_samples.push(sample),
            GaitPhase::StartStop => self.start_stop_samples.push(sample),
            GaitPhase::Instructions => unreachable!("filtered above"),
        }
        Some(sample)
    }

    /// Start/stop task toggle. Returns the new walking state, or `None`
    /// outside the start-stop phase.
    pub fn toggle_walking(&mut self) -> Option<bool> {
        if self.controller.current() != Some(GaitPhase::StartStop) {
            self.qc.log_late();
            debug!("walking toggle outside the start-stop phase; ignored");
            return None;
        }
        self.user_walking = !self.user_walking;
        if let Some(counters) = self.controller.counters_mut() {
            counters.toggles = counters.toggles.saturating_add(1);
        }
        Some(self.user_walking)
    }

    pub fn abort(&mut self) {
        self.controller.cancel();
        self.qc.mark_aborted();
    }

    fn map_transition(&mut self, transition: Transition<GaitPhase>) -> GaitOutcome {
        match transition {
            Transition::Stay => GaitOutcome::Stay,
            Transition::Entered(p) => GaitOutcome::PhaseEntered(p),
            Transition::Completed => GaitOutcome::RunCompleted,
            Transition::Ignored => GaitOutcome::Ignored,
        }
    }

    pub fn metrics(&self) -> Option<GaitMetrics> {
        if !self.is_completed() {
            return None;
        }
        Some(GaitMetrics::from_session(
            self.controller.log(),
            [
                (GaitPhase::Calibration, &self.calibration_samples),
                (GaitPhase::WalkingOutbound, &self.outbound_samples),
                (GaitPhase::Turn, &self.turn_samples),
                (GaitPhase::WalkingReturn, &self.return_samples),
                (GaitPhase::StartStop, &self.start_stop_samples),
            ],
        ))
    }

    pub fn summary(&self) -> Result<Option<SummaryRecord>, EngineError> {
        let Some(metrics) = self.metrics() else {
            return Ok(None);
        };
        SummaryRecord::assemble("gait", &metrics, &self.controller.log(), self.qc.clone())
            .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng;

    fn engine() -> GaitEngine {
        GaitEngine::new(GaitConfig::default(), rng::seeded(17)).unwrap()
    }

    /// Drives one wall-clock second: `rate` sampling ticks then the
    /// countdown tick, mirroring how a shell's timers interleave.
    fn drive_second(engine: &mut GaitEngine, now_ms: &mut f64) -> GaitOutcome {
        let rate = engine.config.sampling_rate_hz;
        for _ in 0..rate {
            *now_ms += 1_000.0 / rate as f64;
            engine.on_sample_tick(*now_ms);
        }
        engine.on_second_tick()
    }

    #[test]
    fn calibration_transitions_exactly_at_its_duration() {
        let mut engine = engine();
        engine.acknowledge_instructions();
        assert_eq!(engine.phase(), Some(GaitPhase::Calibration));

        let mut now = 0.0;
        assert_eq!(drive_second(&mut engine, &mut now), GaitOutcome::Stay);
        assert_eq!(drive_second(&mut engine, &mut now), GaitOutcome::Stay);
        assert_eq!(
            drive_second(&mut engine, &mut now),
            GaitOutcome::PhaseEntered(GaitPhase::WalkingOutbound)
        );

        let calibration = &engine.controller.log()[1];
        assert_eq!(calibration.elapsed_seconds, 3);
        assert_eq!(calibration.samples, 3 * engine.config.sampling_rate_hz);
    }

    #[test]
    fn full_protocol_accumulates_steps_and_samples() {
        let mut engine = engine();
        engine.acknowledge_instructions();
        let mut now = 0.0;
        let mut toggled = false;
        loop {
            let outcome = drive_second(&mut engine, &mut now);
            if engine.phase() == Some(GaitPhase::StartStop) && !toggled {
                // Begin walking as soon as the start-stop task opens.
                engine.toggle_walking();
                toggled = true;
            }
            if outcome == GaitOutcome::RunCompleted {
                break;
            }
        }

        let metrics = engine.metrics().expect("completed run");
        assert!(metrics.summary.total_steps > 0);
        assert_eq!(metrics.summary.start_stop_count, 1);
        assert_eq!(metrics.summary.walking_duration_s, 20);
        assert_eq!(metrics.summary.turn_duration_s, 5);

        let expected_samples: usize = ((3 + 10 + 5 + 10 + 10)
            * engine.config.sampling_rate_hz) as usize;
        assert_eq!(metrics.sensor_data.acc_v.len(), expected_samples);
        assert_eq!(metrics.sensor_data.acc_ml.len(), expected_samples);
        assert_eq!(metrics.sensor_data.acc_ap.len(), expected_samples);
    }

    #[test]
    fn toggle_outside_start_stop_is_ignored() {
        let mut engine = engine();
        engine.acknowledge_instructions();
        assert_eq!(engine.toggle_walking(), None);
        assert_eq!(engine.qc().late_responses, 1);
    }

    #[test]
    fn cancellation_stops_sampling_immediately() {
        let mut engine = engine();
        engine.acknowledge_instructions();
        let mut now = 0.0;
        drive_second(&mut engine, &mut now);
        engine.abort();

        assert!(engine.on_sample_tick(now + 20.0).is_none());
        assert_eq!(engine.on_second_tick(), GaitOutcome::Ignored);
        assert!(engine.metrics().is_none());
        assert!(engine.summary().unwrap().is_none());
    }

    #[test]
    fn sample_ticks_before_acknowledgement_are_dropped() {
        let mut engine = engine();
        assert!(engine.on_sample_tick(0.0).is_none());
        assert_eq!(engine.samples_in_phase(), 0);
    }
}
