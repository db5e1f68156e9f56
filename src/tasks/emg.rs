// FlexZone — EMG Tasks
//
// The sampler task ticks the slice sampler at the sample period and never
// blocks on the detector. The detector task owns each slice for as long as
// detection takes, emits rep and set packets, applies the set-boundary
// policy, and recycles the buffer when done.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::{EMG_SAMPLE_PERIOD_MS, SET_IDLE_TIMEOUT_MS, SET_MAX_DURATION_MS};
use crate::drivers::adc::AdcReader;
use crate::emg::detector::{RepDetector, SliceOutcome};
use crate::emg::sampler::{SamplerTick, SliceSampler};
use crate::emg::SampleSlice;
use crate::events::SetLog;
use crate::packet::{encode_raw_preview, encode_rep_record, encode_set_summary, PacketType};
use crate::transport::{send_packet, PacketSink, Service};

// ---------------------------------------------------------------------------
// Sampler task
// ---------------------------------------------------------------------------
pub fn sampler_task<A: AdcReader>(mut sampler: SliceSampler<A>, running: Arc<AtomicBool>) {
    log::info!("Sampler task started");

    let interval = Duration::from_millis(EMG_SAMPLE_PERIOD_MS);

    while running.load(Ordering::SeqCst) {
        let tick_start = Instant::now();

        match sampler.poll() {
            SamplerTick::Sampled | SamplerTick::SliceDispatched => {}
            SamplerTick::MissedDeadline => {
                log::warn!("Missed deadline, detector still owns the slice buffer");
            }
            SamplerTick::SampleDropped => {
                log::warn!("ADC busy, sample dropped this period");
            }
            SamplerTick::ChannelClosed => {
                log::warn!("Slice channel closed, exiting sampler task");
                break;
            }
        }

        // Sleep for the remainder of the period to hold the sample rate.
        let elapsed = tick_start.elapsed();
        if elapsed < interval {
            thread::sleep(interval - elapsed);
        }
    }

    log::info!(
        "Sampler task done: {} missed deadlines, {} dropped samples",
        sampler.missed_deadlines(),
        sampler.dropped_samples()
    );
}

// ---------------------------------------------------------------------------
// Set-boundary policy
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetBoundary {
    RepsFull,
    IdleTimeout,
    DurationCap,
}

/// Decide whether the current set is over. The detector only measures;
/// where a set ends is decided here, after each slice.
pub fn set_boundary_reason(detector: &RepDetector, outcome: SliceOutcome) -> Option<SetBoundary> {
    let reps = detector.stats().num_reps();
    if outcome.set_full || detector.stats().is_full() {
        return Some(SetBoundary::RepsFull);
    }
    if reps > 0 && detector.idle_ms() >= SET_IDLE_TIMEOUT_MS {
        return Some(SetBoundary::IdleTimeout);
    }
    if reps > 0 && detector.set_elapsed_ms() >= SET_MAX_DURATION_MS {
        return Some(SetBoundary::DurationCap);
    }
    None
}

fn finish_set(
    detector: &mut RepDetector,
    set_log: &mut SetLog,
    set_index: &mut u8,
    sink: &impl PacketSink,
    reason: SetBoundary,
) {
    let stats = detector.take_set();
    log::info!("Set {} finished ({:?}): {} reps", set_index, reason, stats.num_reps());

    let summary = encode_set_summary(*set_index, &stats);
    if let Err(e) = send_packet(sink, Service::Emg, PacketType::Data, &summary) {
        log::warn!("Set summary refused: {}", e);
    }

    if set_log.is_full() {
        log::warn!("Set log full, evicting the oldest set");
    }
    set_log.push_rolling(stats);

    *set_index = set_index.wrapping_add(1);
}

// ---------------------------------------------------------------------------
// Detector task
// ---------------------------------------------------------------------------
pub fn detector_task(
    mut detector: RepDetector,
    slice_rx: Receiver<Box<SampleSlice>>,
    recycle_tx: SyncSender<Box<SampleSlice>>,
    sink: impl PacketSink,
    running: Arc<AtomicBool>,
) {
    log::info!("Detector task started");

    let mut set_log = SetLog::new();
    let mut set_index: u8 = 0;

    while running.load(Ordering::SeqCst) {
        let mut slice = match slice_rx.recv_timeout(Duration::from_millis(200)) {
            Ok(slice) => slice,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                log::warn!("Slice channel closed, exiting detector task");
                break;
            }
        };

        // Frame the raw preview before detection consumes the samples.
        let preview = encode_raw_preview(&slice[..]);
        if let Err(e) = send_packet(&sink, Service::Emg, PacketType::Data, &preview) {
            log::debug!("Raw preview dropped: {}", e);
        }

        let before = detector.stats().num_reps();
        let outcome = detector.process_slice(&mut slice);

        for idx in before..before + outcome.new_reps {
            if let Some(rep) = detector.stats().rep(idx as usize) {
                let payload = encode_rep_record(idx, rep);
                if let Err(e) = send_packet(&sink, Service::Emg, PacketType::Data, &payload) {
                    log::warn!("Rep packet refused: {}", e);
                }
            }
        }
        if outcome.rejected_pulses > 0 {
            log::debug!("{} pulses under the noise floor this slice", outcome.rejected_pulses);
        }

        if let Some(reason) = set_boundary_reason(&detector, outcome) {
            finish_set(&mut detector, &mut set_log, &mut set_index, &sink, reason);
        }

        if recycle_tx.send(slice).is_err() {
            log::warn!("Recycle channel closed, exiting detector task");
            break;
        }
    }

    if set_log.is_empty() {
        log::info!("Detector task done, no sets completed");
    } else {
        let last_reps = set_log.get(set_log.len() - 1).map(|s| s.num_reps()).unwrap_or(0);
        log::info!(
            "Detector task done, {} sets completed, last set {} reps",
            set_log.len(),
            last_reps
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EMG_SAMPLES_PER_SLICE, TRANSPORT_QUEUE_DEPTH};
    use crate::emg::detector::DetectorConfig;
    use crate::packet::{REC_RAW_PREVIEW, REC_REP, REC_SET_SUMMARY};
    use crate::transport::QueueSink;
    use std::sync::mpsc;

    const QUIET: u16 = 500;
    const ACTIVE: u16 = 1700;

    fn quiet_slice() -> SampleSlice {
        [QUIET; EMG_SAMPLES_PER_SLICE]
    }

    /// One 6-sample pulse starting at `at`, quiet elsewhere.
    fn pulse_slice(at: usize) -> SampleSlice {
        let mut slice = quiet_slice();
        for slot in slice[at..at + 6].iter_mut() {
            *slot = ACTIVE;
        }
        slice
    }

    #[test]
    fn test_no_boundary_without_reps() {
        let mut det = RepDetector::new(DetectorConfig::default());
        let mut outcome = SliceOutcome::default();
        for _ in 0..13 {
            let mut slice = quiet_slice();
            outcome = det.process_slice(&mut slice);
        }
        // Well past the idle timeout, but an empty set never closes.
        assert!(det.idle_ms() >= SET_IDLE_TIMEOUT_MS);
        assert_eq!(set_boundary_reason(&det, outcome), None);
    }

    #[test]
    fn test_idle_timeout_after_a_rep() {
        let mut det = RepDetector::new(DetectorConfig::default());
        let mut slice = pulse_slice(2);
        let mut outcome = det.process_slice(&mut slice);
        assert_eq!(outcome.new_reps, 1);

        // Rep closes at sample 8: the first slice banks 42 dead ticks, each
        // quiet slice 50 more. Eleven more stay under 30 s, the twelfth tips.
        for _ in 0..11 {
            let mut slice = quiet_slice();
            outcome = det.process_slice(&mut slice);
            assert_eq!(set_boundary_reason(&det, outcome), None);
        }
        let mut slice = quiet_slice();
        outcome = det.process_slice(&mut slice);
        assert_eq!(set_boundary_reason(&det, outcome), Some(SetBoundary::IdleTimeout));
    }

    #[test]
    fn test_full_set_is_a_boundary() {
        let det = RepDetector::new(DetectorConfig::default());
        let outcome = SliceOutcome { new_reps: 0, rejected_pulses: 0, set_full: true };
        assert_eq!(set_boundary_reason(&det, outcome), Some(SetBoundary::RepsFull));
    }

    #[test]
    fn test_duration_cap_with_slow_reps() {
        let mut det = RepDetector::new(DetectorConfig::default());

        // One rep per 50 s: a 25 s contraction, then 25 s of rest. Twelve of
        // those cross the 10 minute cap with the set nowhere near full.
        let mut outcome = SliceOutcome::default();
        for cycle in 0..12 {
            for _ in 0..10 {
                let mut slice = [ACTIVE; EMG_SAMPLES_PER_SLICE];
                outcome = det.process_slice(&mut slice);
            }
            for _ in 0..10 {
                let mut slice = quiet_slice();
                outcome = det.process_slice(&mut slice);
            }
            if cycle < 11 {
                assert_eq!(set_boundary_reason(&det, outcome), None);
            }
        }

        assert_eq!(set_boundary_reason(&det, outcome), Some(SetBoundary::DurationCap));
        assert_eq!(det.stats().num_reps(), 12);
    }

    #[test]
    fn test_finish_set_logs_and_summarizes() {
        let mut det = RepDetector::new(DetectorConfig::default());
        let mut slice = pulse_slice(2);
        det.process_slice(&mut slice);

        let mut set_log = SetLog::new();
        let mut set_index: u8 = 0;
        let (link_tx, link_rx) = mpsc::sync_channel(4);
        let sink = QueueSink::new(link_tx);

        finish_set(&mut det, &mut set_log, &mut set_index, &sink, SetBoundary::IdleTimeout);

        assert_eq!(set_log.len(), 1);
        assert_eq!(set_index, 1);
        assert_eq!(det.stats().num_reps(), 0);

        let frame = link_rx.try_recv().unwrap();
        let payload = frame.packet.payload();
        assert_eq!(payload[0], REC_SET_SUMMARY);
        assert_eq!(payload[1], 0);
        assert_eq!(payload[2], 1);
    }

    #[test]
    fn test_detector_task_emits_preview_then_rep() {
        let (slice_tx, slice_rx) = mpsc::sync_channel(1);
        let (recycle_tx, recycle_rx) = mpsc::sync_channel(1);
        let (link_tx, link_rx) = mpsc::sync_channel(TRANSPORT_QUEUE_DEPTH);
        let running = Arc::new(AtomicBool::new(true));

        let handle = thread::Builder::new()
            .name("emg-detect".into())
            .spawn({
                let running = running.clone();
                move || {
                    detector_task(
                        RepDetector::new(DetectorConfig::default()),
                        slice_rx,
                        recycle_tx,
                        QueueSink::new(link_tx),
                        running,
                    )
                }
            })
            .unwrap();

        slice_tx.send(Box::new(pulse_slice(2))).unwrap();

        let first = link_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(first.service, Service::Emg);
        assert_eq!(first.packet.payload()[0], REC_RAW_PREVIEW);
        // The preview carries pre-detection samples, not cleared slots.
        assert_eq!(first.packet.payload()[1..3], QUIET.to_le_bytes());

        let second = link_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let payload = second.packet.payload();
        assert_eq!(payload[0], REC_REP);
        assert_eq!(payload[1], 0);
        assert_eq!(payload[2..6], 350u32.to_le_bytes());

        // The consumed buffer comes back cleared for the sampler.
        let back = recycle_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(back.iter().all(|&s| s == 0));

        running.store(false, Ordering::SeqCst);
        handle.join().unwrap();
    }
}
