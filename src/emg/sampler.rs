// FlexZone — Slice Sampler
//
// Runs once per sample period in the sampler task, standing in for a clock
// interrupt on the target: never blocks, never retries. Each tick averages a
// burst of ADC reads into one slice sample; the fiftieth sample dispatches
// the slice to the detector. If the detector still owns the buffer when a
// tick lands, that tick is a missed deadline and its sample is lost.

use std::sync::mpsc::{Receiver, SyncSender, TryRecvError, TrySendError};

use crate::config::{EMG_READS_PER_SAMPLE, EMG_SAMPLES_PER_SLICE};
use crate::drivers::adc::{AdcChannel, AdcReader};
use crate::emg::SampleSlice;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy)]
pub struct SamplerConfig {
    pub channel: AdcChannel,
    pub reads_per_sample: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self { channel: AdcChannel::Ch0, reads_per_sample: EMG_READS_PER_SAMPLE }
    }
}

// ---------------------------------------------------------------------------
// Tick outcome
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerTick {
    /// One averaged sample appended to the slice.
    Sampled,
    /// The appended sample completed the slice and it went to the detector.
    SliceDispatched,
    /// The detector still owns the buffer; this tick is lost.
    MissedDeadline,
    /// The ADC was busy; this period contributes no sample.
    SampleDropped,
    /// The detector side is gone.
    ChannelClosed,
}

// ---------------------------------------------------------------------------
// Sampler
// ---------------------------------------------------------------------------
pub struct SliceSampler<A: AdcReader> {
    adc: A,
    cfg: SamplerConfig,
    slice_tx: SyncSender<Box<SampleSlice>>,
    recycle_rx: Receiver<Box<SampleSlice>>,
    slice: Option<Box<SampleSlice>>,
    fill: usize,
    missed_deadlines: u64,
    dropped_samples: u64,
}

impl<A: AdcReader> SliceSampler<A> {
    /// The sampler starts out owning the single circulating buffer.
    pub fn new(
        adc: A,
        cfg: SamplerConfig,
        slice_tx: SyncSender<Box<SampleSlice>>,
        recycle_rx: Receiver<Box<SampleSlice>>,
    ) -> Self {
        Self {
            adc,
            cfg,
            slice_tx,
            recycle_rx,
            slice: Some(Box::new([0; EMG_SAMPLES_PER_SLICE])),
            fill: 0,
            missed_deadlines: 0,
            dropped_samples: 0,
        }
    }

    /// One sampling tick. Call at the sample period; returns immediately.
    pub fn poll(&mut self) -> SamplerTick {
        if self.slice.is_none() {
            match self.recycle_rx.try_recv() {
                Ok(buf) => {
                    self.slice = Some(buf);
                    self.fill = 0;
                }
                Err(TryRecvError::Empty) => {
                    self.missed_deadlines += 1;
                    return SamplerTick::MissedDeadline;
                }
                Err(TryRecvError::Disconnected) => return SamplerTick::ChannelClosed,
            }
        }

        let mut sum: u32 = 0;
        for _ in 0..self.cfg.reads_per_sample.max(1) {
            match self.adc.read_sample(self.cfg.channel) {
                Ok(v) => sum += u32::from(v),
                Err(_) => {
                    self.dropped_samples += 1;
                    return SamplerTick::SampleDropped;
                }
            }
        }
        let mean = (sum / self.cfg.reads_per_sample.max(1) as u32) as u16;

        // The second electrode is diagnostics only, one read per tick.
        if let Ok(aux) = self.adc.read_sample(self.cfg.channel.other()) {
            log::debug!("EMG ch0 {} ch1 {}", mean, aux);
        }

        if let Some(slice) = self.slice.as_mut() {
            if self.fill < EMG_SAMPLES_PER_SLICE {
                slice[self.fill] = mean;
                self.fill += 1;
            }
        }

        if self.fill == EMG_SAMPLES_PER_SLICE {
            if let Some(full) = self.slice.take() {
                match self.slice_tx.try_send(full) {
                    Ok(()) => return SamplerTick::SliceDispatched,
                    Err(TrySendError::Full(buf)) => {
                        // Unreachable with a single circulating buffer;
                        // discard the slice and count the tick as missed.
                        self.slice = Some(buf);
                        self.fill = 0;
                        self.missed_deadlines += 1;
                        return SamplerTick::MissedDeadline;
                    }
                    Err(TrySendError::Disconnected(_)) => return SamplerTick::ChannelClosed,
                }
            }
        }

        SamplerTick::Sampled
    }

    pub fn missed_deadlines(&self) -> u64 {
        self.missed_deadlines
    }

    pub fn dropped_samples(&self) -> u64 {
        self.dropped_samples
    }
}
