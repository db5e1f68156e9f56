// FlexZone — Firmware Core Entry Point
//
// Boot sequence:
//   1. Initialise terminal logging.
//   2. Bring up the analog front end and program electrode gain.
//   3. Wire the channels: one slice buffer circulating between sampler and
//      detector, plus the bounded outbound link queue.
//   4. Spawn the sampler, detector, accel, and link tasks.
//   5. Wait for Ctrl-C, then flag shutdown and join every task.
//
// On hardware the sampler tick runs from a clock interrupt and the link
// queue feeds the BLE stack; here both ends are host stand-ins around the
// same pipeline code.

mod config;
mod drivers;
mod emg;
mod error;
mod events;
mod packet;
mod tasks;
mod transport;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use simplelog::{ColorChoice, LevelFilter, TermLogger, TerminalMode};

use crate::config::*;
use crate::drivers::adc::SimFrontEnd;
use crate::drivers::imu::SimImu;
use crate::emg::detector::{DetectorConfig, RepDetector};
use crate::emg::sampler::{SamplerConfig, SliceSampler};
use crate::emg::SampleSlice;
use crate::packet::{Packet, PacketType, PARAM_GAIN};
use crate::transport::{LinkFrame, QueueSink};

fn main() -> anyhow::Result<()> {
    TermLogger::init(
        LevelFilter::Info,
        simplelog::Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )?;
    log::info!("FlexZone core starting");

    // ---- Analog front end and detector ------------------------------------
    let mut front_end = SimFrontEnd::new();
    let mut detector = RepDetector::new(DetectorConfig::default());

    // Boot gain goes through the same decode path a peer config write takes.
    let boot_gain = [PacketType::Config as u8, 2, PARAM_GAIN, DIGIPOT_DEFAULT_WIPER];
    let cmd = Packet::from_wire(&boot_gain)?.parse_config()?;
    transport::apply_config(cmd, &mut detector, &mut front_end)?;
    log::info!("Front end ready, wipers at {}", DIGIPOT_DEFAULT_WIPER);

    // ---- Channels ---------------------------------------------------------
    // Slice and recycle channels carry the single circulating buffer.
    let (slice_tx, slice_rx) = mpsc::sync_channel::<Box<SampleSlice>>(1);
    let (recycle_tx, recycle_rx) = mpsc::sync_channel::<Box<SampleSlice>>(1);
    let (link_tx, link_rx) = mpsc::sync_channel::<LinkFrame>(TRANSPORT_QUEUE_DEPTH);
    let sink = QueueSink::new(link_tx);

    // ---- Shutdown flag ----------------------------------------------------
    let running = Arc::new(AtomicBool::new(true));
    {
        let r = running.clone();
        ctrlc::set_handler(move || {
            log::info!("Ctrl-C received, shutting down");
            r.store(false, Ordering::SeqCst);
        })?;
    }

    // ---- Pipeline state ---------------------------------------------------
    let sampler = SliceSampler::new(front_end, SamplerConfig::default(), slice_tx, recycle_rx);

    // ---- Spawn tasks ------------------------------------------------------
    let sampler_running = running.clone();
    let sampler_handle = thread::Builder::new()
        .name("emg-sampler".into())
        .stack_size(STACK_SAMPLER)
        .spawn(move || {
            tasks::emg::sampler_task(sampler, sampler_running);
        })?;

    let detector_sink = sink.clone();
    let detector_running = running.clone();
    let detector_handle = thread::Builder::new()
        .name("emg-detect".into())
        .stack_size(STACK_DETECTOR)
        .spawn(move || {
            tasks::emg::detector_task(
                detector,
                slice_rx,
                recycle_tx,
                detector_sink,
                detector_running,
            );
        })?;

    let accel_running = running.clone();
    let accel_handle = thread::Builder::new()
        .name("accel".into())
        .stack_size(STACK_ACCEL)
        .spawn(move || {
            tasks::accel::accel_task(SimImu::new(), sink, accel_running);
        })?;

    let link_running = running.clone();
    let link_handle = thread::Builder::new()
        .name("ble-link".into())
        .stack_size(STACK_LINK)
        .spawn(move || {
            transport::link_task(link_rx, link_running);
        })?;

    log::info!("All tasks running");

    // ---- Wait for shutdown ------------------------------------------------
    while running.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(200));
    }

    for (name, handle) in [
        ("sampler", sampler_handle),
        ("detector", detector_handle),
        ("accel", accel_handle),
        ("link", link_handle),
    ] {
        match handle.join() {
            Ok(()) => log::info!("{} task joined", name),
            Err(_) => log::error!("{} task panicked", name),
        }
    }

    log::info!("FlexZone core stopped");
    Ok(())
}
