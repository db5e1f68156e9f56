// FlexZone — Accelerometer Task
//
// Streams raw 6-axis samples over the accel service at 5 Hz. Read faults are
// logged and skipped; the stream carries on.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::ACCEL_SAMPLE_PERIOD_MS;
use crate::drivers::imu::ImuReader;
use crate::error::PacketError;
use crate::packet::PacketType;
use crate::transport::{send_packet, PacketSink, Service};

pub fn accel_task(mut imu: impl ImuReader, sink: impl PacketSink, running: Arc<AtomicBool>) {
    log::info!("Accel task started");

    let interval = Duration::from_millis(ACCEL_SAMPLE_PERIOD_MS);

    while running.load(Ordering::SeqCst) {
        let tick_start = Instant::now();

        match imu.read_sample() {
            Ok(sample) => {
                let payload = sample.to_wire();
                match send_packet(&sink, Service::Accel, PacketType::Data, &payload) {
                    Ok(()) => {}
                    Err(PacketError::LinkDown) => {
                        log::warn!("Link is gone, exiting accel task");
                        return;
                    }
                    Err(e) => log::debug!("Accel frame dropped: {}", e),
                }
            }
            Err(e) => log::warn!("IMU read error: {}", e),
        }

        let elapsed = tick_start.elapsed();
        if elapsed < interval {
            thread::sleep(interval - elapsed);
        }
    }

    log::info!("Accel task done");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ACCEL_WIRE_LEN, EMG_MAX_PAYLOAD, TRANSPORT_QUEUE_DEPTH};
    use crate::drivers::imu::SimImu;
    use crate::transport::QueueSink;
    use std::sync::mpsc;

    #[test]
    fn test_accel_payload_fits_the_stream() {
        assert!(ACCEL_WIRE_LEN <= EMG_MAX_PAYLOAD);
    }

    #[test]
    fn test_accel_task_streams_frames() {
        let (link_tx, link_rx) = mpsc::sync_channel(TRANSPORT_QUEUE_DEPTH);
        let running = Arc::new(AtomicBool::new(true));

        let handle = thread::Builder::new()
            .name("accel".into())
            .spawn({
                let running = running.clone();
                move || accel_task(SimImu::new(), QueueSink::new(link_tx), running)
            })
            .unwrap();

        let frame = link_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(frame.service, Service::Accel);
        assert_eq!(frame.packet.payload_len(), ACCEL_WIRE_LEN);

        running.store(false, Ordering::SeqCst);
        handle.join().unwrap();
    }
}
