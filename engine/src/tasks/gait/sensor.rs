//! Synthetic IMU stream standing in for the device accelerometers.
//!
//! The emitter produces one plausible tri-axis reading per sampling
//! tick, shaped by the active protocol phase: near-still noise during
//! calibration, a cadence-locked vertical oscillation while walking
//! (with a step event on a fixed sub-phase of each cycle), a faster
//! lateral oscillation through the turn, and a user-toggled
//! walking/stopped branch for the start-stop task. A hardware adapter
//! satisfies the same [`SensorSource`] contract, so the scoring path
//! never knows which source fed it.

use rand::Rng;
use serde::Serialize;

use crate::core::rng::SessionRng;
use crate::core::timing::InstantStamp;

use super::engine::GaitPhase;

/// Step events fire when the oscillation crosses this sub-phase.
const STEP_SUB_PHASE: f64 = std::f64::consts::FRAC_PI_2;

/// One tri-axis accelerometer reading: vertical, mediolateral,
/// anteroposterior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImuSample {
    pub t_ms: InstantStamp,
    pub acc_v: f64,
    pub acc_ml: f64,
    pub acc_ap: f64,
}

/// Per-tick context the engine passes to its source.
#[derive(Debug, Clone, Copy)]
pub struct SampleContext {
    pub phase: GaitPhase,
    pub t_ms: InstantStamp,
    /// Whether the participant is currently walking. Fixed by the phase
    /// except during the start-stop task, where the user toggles it.
    pub walking: bool,
}

/// One emitted reading plus whether a step event fired on this tick.
#[derive(Debug, Clone, Copy)]
pub struct Emission {
    pub sample: ImuSample,
    pub step: bool,
}

pub trait SensorSource {
    fn sample(&mut self, ctx: SampleContext) -> Emission;
}

/// Shape parameters of the synthetic stream.
#[derive(Debug, Clone)]
pub struct ImuProfile {
    /// Step oscillation frequency while walking, in Hz.
    pub cadence_hz: f64,
    /// Vertical oscillation amplitude while walking, in m/s².
    pub walk_amplitude: f64,
    /// Mediolateral/anteroposterior sway amplitude while walking.
    pub sway_amplitude: f64,
    /// Lateral oscillation amplitude through the turn.
    pub turn_amplitude: f64,
    /// Oscillation speed-up factor through the turn.
    pub turn_rate_multiplier: f64,
    /// Uniform noise amplitude superimposed on every axis.
    pub noise_amplitude: f64,
}

impl Default for ImuProfile {
    fn default() -> Self {
        Self {
            cadence_hz: 1.8,
            walk_amplitude: 2.5,
            sway_amplitude: 0.8,
            turn_amplitude: 1.6,
            turn_rate_multiplier: 2.5,
            noise_amplitude: 0.05,
        }
    }
}

#[derive(Debug)]
pub struct SyntheticImu {
    profile: ImuProfile,
    sampling_rate_hz: u32,
    rng: SessionRng,
    phase_angle: f64,
}

impl SyntheticImu {
    pub fn new(profile: ImuProfile, sampling_rate_hz: u32, rng: SessionRng) -> Self {
        Self {
            profile,
            sampling_rate_hz: sampling_rate_hz.max(1),
            rng,
            phase_angle: 0.0,
        }
    }

    fn noise(&mut self) -> f64 {
        (self.rng.gen::<f64>() - 0.5) * 2.0 * self.profile.noise_amplitude
    }

    /// Near-still reading for calibration, rest, and stopped intervals.
    fn rest_sample(&mut self, t_ms: InstantStamp) -> Emission {
        Emission {
            sample: ImuSample {
                t_ms,
                acc_v: self.noise(),
                acc_ml: self.noise(),
                acc_ap: self.noise(),
            },
            step: false,
        }
    }

    /// Cadence-locked gait oscillation. A step event fires once per
    /// cycle when the advancing angle crosses the step sub-phase.
    fn walking_sample(&mut self, t_ms: InstantStamp) -> Emission {
        let step = self.advance(self.profile.cadence_hz);
        let angle = self.phase_angle;
        Emission {
            sample: ImuSample {
                t_ms,
                acc_v: self.profile.walk_amplitude * angle.sin() + self.noise(),
                acc_ml: self.profile.sway_amplitude
                    * (angle + std::f64::consts::FRAC_PI_3).sin()
                    + self.noise(),
                acc_ap: self.profile.sway_amplitude * angle.cos() + self.noise(),
            },
            step,
        }
    }

    /// Higher-frequency lateral oscillation while turning in place.
    fn turn_sample(&mut self, t_ms: InstantStamp) -> Emission {
        self.advance(self.profile.cadence_hz * self.profile.turn_rate_multiplier);
        let angle = self.phase_angle;
        Emission {
            sample: ImuSample {
                t_ms,
                acc_v: self.profile.walk_amplitude * 0.4 * angle.sin() + self.noise(),
                acc_ml: self.profile.turn_amplitude * angle.sin() + self.noise(),
                acc_ap: self.noise(),
            },
            step: false,
        }
    }

    /// Advances the oscillation by one tick at `frequency_hz`; returns
    /// whether the step sub-phase was crossed.
    fn advance(&mut self, frequency_hz: f64) -> bool {
        let prev = self.phase_angle;
        self.phase_angle += std::f64::consts::TAU * frequency_hz / self.sampling_rate_hz as f64;
        let step = prev < STEP_SUB_PHASE && self.phase_angle >= STEP_SUB_PHASE;
        if self.phase_angle >= std::f64::consts::TAU {
            self.phase_angle -= std::f64::consts::TAU;
        }
        step
    }
}

impl SensorSource for SyntheticImu {
    fn sample(&mut self, ctx: SampleContext) -> Emission {
        match ctx.phase {
            GaitPhase::WalkingOutbound | GaitPhase::WalkingReturn => {
                self.walking_sample(ctx.t_ms)
            }
            GaitPhase::Turn => self.turn_sample(ctx.t_ms),
            GaitPhase::StartStop => {
                if ctx.walking {
                    self.walking_sample(ctx.t_ms)
                } else {
                    self.rest_sample(ctx.t_ms)
                }
            }
            GaitPhase::Instructions | GaitPhase::Calibration => self.rest_sample(ctx.t_ms),
        }
    }
}
