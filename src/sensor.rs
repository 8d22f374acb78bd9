//! # Sensor Acquisition Module
//!
//! Periodic ADC sampling in interrupt context. On the device a hardware timer
//! fires every `sample_interval_ms` and its handler does nothing but read the
//! ADC and push into the sample queue. On the host the same loop runs on a
//! dedicated thread, gated by atomic flags instead of timer enable bits.
//!
//! ## Key Types
//! - `AdcChannel`: source of raw readings
//! - `SyntheticPpg`: deterministic PPG-shaped signal used in place of a sensor
//! - `Sampler`: the emulated timer interrupt
//! - `SamplerHandle`: start/stop control used by the session controller

use crate::queue::QueueWriter;
use std::f64::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One raw ADC reading
pub type Sample = u16;

pub trait AdcChannel: Send {
    fn read_u16(&mut self) -> Sample;
}

/// Starts and stops sample production
pub trait AcquisitionControl {
    fn start(&mut self);
    fn stop(&mut self);
}

const BASELINE: f64 = 30_000.0;
const PULSE_AMPLITUDE: f64 = 12_000.0;
const DRIFT_AMPLITUDE: f64 = 600.0;
// Slow respiratory-like baseline wander
const DRIFT_PERIOD_MS: f64 = 4_000.0;
// Beat-to-beat variation repeats every this many beats
const VARIABILITY_CYCLE_BEATS: f64 = 7.0;

/// PPG-like waveform: a sharp systolic pulse followed by a smaller dicrotic
/// wave, over a slowly wandering baseline.
#[derive(Debug, Clone)]
pub struct SyntheticPpg {
    sample_interval_ms: f64,
    mean_beat_ms: f64,
    variability_ms: f64,
    beat: u32,
    beat_ms: f64,
    phase_ms: f64,
    elapsed_ms: f64,
}

impl SyntheticPpg {
    pub fn new(sample_interval_ms: u32, heart_rate_bpm: f64, variability_ms: f64) -> Self {
        let mean_beat_ms = 60_000.0 / heart_rate_bpm.max(1.0);
        Self {
            sample_interval_ms: sample_interval_ms as f64,
            mean_beat_ms,
            variability_ms,
            beat: 0,
            beat_ms: mean_beat_ms,
            phase_ms: 0.0,
            elapsed_ms: 0.0,
        }
    }

    fn beat_length(&self, beat: u32) -> f64 {
        let angle = 2.0 * PI * beat as f64 / VARIABILITY_CYCLE_BEATS;
        self.mean_beat_ms + self.variability_ms * angle.sin()
    }

    fn pulse_shape(phase: f64) -> f64 {
        let systolic = (-((phase - 0.16) / 0.05).powi(2)).exp();
        let dicrotic = 0.3 * (-((phase - 0.45) / 0.08).powi(2)).exp();
        systolic + dicrotic
    }

    pub fn next_sample(&mut self) -> Sample {
        let phase = self.phase_ms / self.beat_ms;
        let drift = DRIFT_AMPLITUDE * (2.0 * PI * self.elapsed_ms / DRIFT_PERIOD_MS).sin();
        let value = BASELINE + drift + PULSE_AMPLITUDE * Self::pulse_shape(phase);

        self.elapsed_ms += self.sample_interval_ms;
        self.phase_ms += self.sample_interval_ms;
        if self.phase_ms >= self.beat_ms {
            self.phase_ms -= self.beat_ms;
            self.beat = self.beat.wrapping_add(1);
            self.beat_ms = self.beat_length(self.beat);
        }

        value.round().clamp(0.0, Sample::MAX as f64) as Sample
    }
}

impl AdcChannel for SyntheticPpg {
    fn read_u16(&mut self) -> Sample {
        self.next_sample()
    }
}

/// Control side of a running `Sampler`
#[derive(Debug, Clone)]
pub struct SamplerHandle {
    running: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
}

impl SamplerHandle {
    /// Ask the sampler thread to exit
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::Relaxed);
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

impl AcquisitionControl for SamplerHandle {
    fn start(&mut self) {
        log::debug!("Sampler: timer enabled");
        self.running.store(true, Ordering::Relaxed);
    }

    fn stop(&mut self) {
        if self.running.swap(false, Ordering::Relaxed) {
            log::debug!("Sampler: timer disabled");
        }
    }
}

/// Emulated timer interrupt feeding the sample queue
pub struct Sampler<A: AdcChannel> {
    adc: A,
    period: Duration,
    running: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
}

impl<A: AdcChannel> Sampler<A> {
    /// Creates a stopped sampler and the handle that controls it
    pub fn new(adc: A, period: Duration) -> (Self, SamplerHandle) {
        let running = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(AtomicBool::new(false));

        let handle = SamplerHandle {
            running: running.clone(),
            shutdown: shutdown.clone(),
        };
        let sampler = Sampler {
            adc,
            period,
            running,
            shutdown,
        };

        (sampler, handle)
    }

    /// Runs the tick loop until shutdown.
    ///
    /// Ticks are scheduled against a fixed start instant so sleep jitter does
    /// not accumulate into the sampling rate.
    pub fn run<const N: usize>(mut self, mut samples: QueueWriter<'_, Sample, N>) {
        let mut next_tick = Instant::now();
        let mut reported_drops = 0;

        while !self.shutdown.load(Ordering::Relaxed) {
            next_tick += self.period;
            let now = Instant::now();
            if next_tick > now {
                std::thread::sleep(next_tick - now);
            } else if now - next_tick > self.period * 100 {
                // Fell far behind (host suspended); resynchronise
                next_tick = now;
            }

            if !self.running.load(Ordering::Relaxed) {
                continue;
            }

            samples.try_push(self.adc.read_u16());

            if samples.dropped() != reported_drops {
                reported_drops = samples.dropped();
                log::warn!("Sampler: queue full, {} samples dropped so far", reported_drops);
            }
        }

        log::info!("Sampler: shut down");
    }
}
