// FlexZone — Link Transport
// Boundary between the pipeline and the wireless service layer. Tasks hand
// finished packets to a `PacketSink` and move on; delivery is asynchronous
// through a bounded queue and a full queue refuses the frame rather than
// stalling acquisition.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::Arc;
use std::time::Duration;

use crate::drivers::adc::GainControl;
use crate::emg::detector::RepDetector;
use crate::error::PacketError;
use crate::packet::{ConfigCommand, Packet, PacketType};

// ---------------------------------------------------------------------------
// Frames and Services
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Emg,
    Accel,
}

#[derive(Debug, Clone, Copy)]
pub struct LinkFrame {
    pub service: Service,
    pub packet: Packet,
}

// ---------------------------------------------------------------------------
// Packet Sink
// ---------------------------------------------------------------------------
pub trait PacketSink {
    fn submit(&self, frame: LinkFrame) -> Result<(), PacketError>;
}

/// Sink over the bounded outbound queue. Cloned into every producing task.
#[derive(Clone)]
pub struct QueueSink {
    tx: SyncSender<LinkFrame>,
}

impl QueueSink {
    pub fn new(tx: SyncSender<LinkFrame>) -> Self {
        Self { tx }
    }
}

impl PacketSink for QueueSink {
    fn submit(&self, frame: LinkFrame) -> Result<(), PacketError> {
        self.tx.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => PacketError::QueueFull,
            TrySendError::Disconnected(_) => PacketError::LinkDown,
        })
    }
}

/// Frame a payload and submit it in one step.
pub fn send_packet(
    sink: &impl PacketSink,
    service: Service,
    packet_type: PacketType,
    payload: &[u8],
) -> Result<(), PacketError> {
    let packet = Packet::new(packet_type, payload)?;
    sink.submit(LinkFrame { service, packet })
}

// ---------------------------------------------------------------------------
// Peer configuration writes
// ---------------------------------------------------------------------------

/// Apply a decoded peer write to the pipeline: threshold updates go to the
/// detector (which keeps the hysteresis band valid), a gain update programs
/// both electrode pots.
pub fn apply_config(
    cmd: ConfigCommand,
    detector: &mut RepDetector,
    gain: &mut impl GainControl,
) -> Result<(), PacketError> {
    match cmd {
        ConfigCommand::SetThresholdHigh(high) => {
            let low = detector.config().threshold_low;
            detector.set_thresholds(high, low)
        }
        ConfigCommand::SetThresholdLow(low) => {
            let high = detector.config().threshold_high;
            detector.set_thresholds(high, low)
        }
        ConfigCommand::SetGain(wiper) => {
            gain.set_wiper(0, wiper).map_err(|_| PacketError::InvalidParam)?;
            gain.set_wiper(1, wiper).map_err(|_| PacketError::InvalidParam)
        }
    }
}

// ---------------------------------------------------------------------------
// Link Task — stands in for the BLE service layer
// ---------------------------------------------------------------------------
pub fn link_task(link_rx: Receiver<LinkFrame>, running: Arc<AtomicBool>) {
    log::info!("Link task started");

    let mut delivered: u64 = 0;

    while running.load(Ordering::SeqCst) {
        match link_rx.recv_timeout(Duration::from_millis(200)) {
            Ok(frame) => {
                delivered += 1;
                log::debug!(
                    "Link delivered {:?}/{:?}, {} payload bytes: {:02X?}",
                    frame.service,
                    frame.packet.packet_type(),
                    frame.packet.payload_len(),
                    frame.packet.wire()
                );
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                log::warn!("Link queue closed — exiting link task");
                break;
            }
        }
    }

    log::info!("Link task done, {} frames delivered", delivered);
}
