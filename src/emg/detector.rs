// FlexZone — Rep Detector
//
// Hysteresis state machine over averaged EMG samples. A sample at or above
// the high threshold opens a contraction pulse, a sample below the low
// threshold closes it; the band between the two belongs to whichever state
// is current, so chatter around a single threshold cannot split a rep.
// Widths are tick counts scaled by the sample period. Pulses at or under
// the noise floor dissolve back into the surrounding dead interval.

use std::cmp::Ordering;

use crate::config::{
    EMG_MIN_PULSE_WIDTH_MS, EMG_SAMPLE_PERIOD_MS, EMG_THRESHOLD_HIGH, EMG_THRESHOLD_LOW,
};
use crate::emg::SampleSlice;
use crate::error::PacketError;
use crate::events::{RepRecord, SetStats};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy)]
pub struct DetectorConfig {
    pub threshold_high: u16,
    pub threshold_low: u16,
    pub sample_period_ms: u32,
    pub min_pulse_width_ms: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            threshold_high: EMG_THRESHOLD_HIGH,
            threshold_low: EMG_THRESHOLD_LOW,
            sample_period_ms: EMG_SAMPLE_PERIOD_MS as u32,
            min_pulse_width_ms: EMG_MIN_PULSE_WIDTH_MS,
        }
    }
}

// ---------------------------------------------------------------------------
// Per-slice outcome
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SliceOutcome {
    pub new_reps: u8,
    pub rejected_pulses: u8,
    pub set_full: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PulseState {
    Idle,
    InPulse,
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------
pub struct RepDetector {
    cfg: DetectorConfig,
    state: PulseState,
    pulse_ticks: u32,
    dead_ticks: u32,
    pending_dead_ticks: u32,
    peak_value: u16,
    peak_tick: u32,
    set_ticks: u32,
    stats: SetStats,
}

impl RepDetector {
    pub fn new(cfg: DetectorConfig) -> Self {
        Self {
            cfg,
            state: PulseState::Idle,
            pulse_ticks: 0,
            dead_ticks: 0,
            pending_dead_ticks: 0,
            peak_value: 0,
            peak_tick: 0,
            set_ticks: 0,
            stats: SetStats::new(),
        }
    }

    /// One left-to-right pass over a slice. Pulse state and tick counters
    /// persist across calls, so a contraction running off the end of one
    /// slice continues into the next. Consumed slots are zeroed.
    pub fn process_slice(&mut self, slice: &mut SampleSlice) -> SliceOutcome {
        let mut outcome = SliceOutcome::default();

        for slot in slice.iter_mut() {
            let sample = *slot;

            if sample >= self.cfg.threshold_high {
                if self.state == PulseState::Idle {
                    self.open_pulse();
                }
                self.pulse_ticks = self.pulse_ticks.saturating_add(1);
                if sample > self.peak_value {
                    self.peak_value = sample;
                    self.peak_tick = self.pulse_ticks;
                }
            } else if sample >= self.cfg.threshold_low {
                // Hysteresis band: stay the course.
                match self.state {
                    PulseState::InPulse => self.pulse_ticks = self.pulse_ticks.saturating_add(1),
                    PulseState::Idle => self.dead_ticks = self.dead_ticks.saturating_add(1),
                }
            } else {
                if self.state == PulseState::InPulse {
                    self.close_pulse(&mut outcome);
                }
                self.dead_ticks = self.dead_ticks.saturating_add(1);
            }

            if self.set_active() {
                self.set_ticks = self.set_ticks.saturating_add(1);
            }

            *slot = 0;
        }

        outcome
    }

    fn open_pulse(&mut self) {
        self.state = PulseState::InPulse;
        self.pending_dead_ticks = self.dead_ticks;
        self.dead_ticks = 0;
        self.pulse_ticks = 0;
        self.peak_value = 0;
        self.peak_tick = 0;
    }

    fn close_pulse(&mut self, outcome: &mut SliceOutcome) {
        self.state = PulseState::Idle;

        // The rising crossing landed inside the tick before the first high
        // sample, so that boundary tick counts toward the pulse.
        let width_ticks = self.pulse_ticks.saturating_add(1);
        let width_ms = width_ticks.saturating_mul(self.cfg.sample_period_ms);

        if width_ms > self.cfg.min_pulse_width_ms {
            let concentric_ms =
                self.peak_tick.saturating_add(1).saturating_mul(self.cfg.sample_period_ms);
            let rep = RepRecord {
                pulse_width_ms: width_ms,
                dead_width_ms: self
                    .pending_dead_ticks
                    .saturating_mul(self.cfg.sample_period_ms),
                concentric_ms,
                eccentric_ms: width_ms.saturating_sub(concentric_ms),
            };
            match self.stats.push_rep(rep) {
                Ok(idx) => {
                    outcome.new_reps += 1;
                    log::info!(
                        "Rep {}: pulse {} ms after {} ms dead",
                        idx + 1,
                        rep.pulse_width_ms,
                        rep.dead_width_ms
                    );
                }
                Err(_) => {
                    outcome.set_full = true;
                    log::warn!("Set is full, rep of {} ms refused", width_ms);
                }
            }
        } else {
            // Noise blip: fold its ticks back into the running dead interval.
            outcome.rejected_pulses += 1;
            self.dead_ticks = self.pending_dead_ticks.saturating_add(self.pulse_ticks);
            log::debug!("Pulse of {} ms under the noise floor, rejected", width_ms);
        }

        self.pulse_ticks = 0;
        self.pending_dead_ticks = 0;
        self.peak_value = 0;
        self.peak_tick = 0;
    }

    /// A set is underway once it holds a rep or a pulse is in flight.
    fn set_active(&self) -> bool {
        self.stats.num_reps() > 0 || self.state == PulseState::InPulse
    }

    /// Milliseconds of the dead interval currently running. Zero in a pulse.
    pub fn idle_ms(&self) -> u32 {
        self.dead_ticks.saturating_mul(self.cfg.sample_period_ms)
    }

    /// Milliseconds since the current set's first pulse opened.
    pub fn set_elapsed_ms(&self) -> u32 {
        self.set_ticks.saturating_mul(self.cfg.sample_period_ms)
    }

    pub fn stats(&self) -> &SetStats {
        &self.stats
    }

    /// Hand over the finished set and start accumulating a new one. An
    /// in-flight pulse and the running dead interval carry across; they
    /// belong to whichever set they complete in.
    pub fn take_set(&mut self) -> SetStats {
        self.set_ticks = 0;
        std::mem::take(&mut self.stats)
    }

    /// Apply a peer threshold write. The pair must keep a real hysteresis
    /// band, so `high` at or below `low` is refused.
    pub fn set_thresholds(&mut self, high: u16, low: u16) -> Result<(), PacketError> {
        match high.cmp(&low) {
            Ordering::Greater => {
                self.cfg.threshold_high = high;
                self.cfg.threshold_low = low;
                log::info!("Detector thresholds now {}/{}", high, low);
                Ok(())
            }
            _ => Err(PacketError::InvalidParam),
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.cfg
    }
}
