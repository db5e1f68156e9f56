// FlexZone — EMG Analog Front End
//
// The sampling path needs exactly two things from hardware: one-shot ADC
// conversions on the electrode channels and wiper control over the digital
// potentiometers that set electrode gain. Both are traits here; the real
// board wires them to the AUX ADC and the SPI digipots, the simulated front
// end below generates a workout-shaped waveform for host runs.

use std::time::Instant;

use crate::config::*;
use crate::error::AdcError;

// ---------------------------------------------------------------------------
// Interfaces
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdcChannel {
    Ch0,
    Ch1,
}

impl AdcChannel {
    /// The opposite electrode channel.
    pub fn other(self) -> Self {
        match self {
            AdcChannel::Ch0 => AdcChannel::Ch1,
            AdcChannel::Ch1 => AdcChannel::Ch0,
        }
    }
}

pub trait AdcReader {
    /// One bounded-time conversion. `Busy` means the converter could not
    /// take the sample this instant; callers skip rather than wait.
    fn read_sample(&mut self, channel: AdcChannel) -> Result<u16, AdcError>;
}

pub trait GainControl {
    /// Program one digipot wiper. Pot 0 and 1 sit on the two electrode paths.
    fn set_wiper(&mut self, pot: u8, value: u8) -> Result<(), AdcError>;
}

// ---------------------------------------------------------------------------
// Simulated front end
// ---------------------------------------------------------------------------

/// Generates contraction bursts over a resting baseline so the detector sees
/// something rep-shaped: rest, contract for a couple of seconds, rest again,
/// with measurement noise on top and the occasional busy converter.
pub struct SimFrontEnd {
    started: Instant,
    wipers: [u8; 2],
}

impl SimFrontEnd {
    pub fn new() -> Self {
        Self { started: Instant::now(), wipers: [DIGIPOT_DEFAULT_WIPER; 2] }
    }

    fn waveform_level(&self) -> u16 {
        let phase = self.started.elapsed().as_millis() as u64 % SIM_CONTRACTION_PERIOD_MS;
        if phase < SIM_CONTRACTION_HOLD_MS {
            SIM_ACTIVE_LEVEL
        } else {
            SIM_REST_LEVEL
        }
    }
}

impl Default for SimFrontEnd {
    fn default() -> Self {
        Self::new()
    }
}

impl AdcReader for SimFrontEnd {
    fn read_sample(&mut self, channel: AdcChannel) -> Result<u16, AdcError> {
        if rand::random_range(0..SIM_BUSY_ONE_IN) == 0 {
            return Err(AdcError::Busy);
        }

        let wiper = match channel {
            AdcChannel::Ch0 => self.wipers[0],
            AdcChannel::Ch1 => self.wipers[1],
        };
        let scaled =
            u32::from(self.waveform_level()) * u32::from(wiper) / u32::from(DIGIPOT_DEFAULT_WIPER);
        let noise = rand::random_range(-i32::from(SIM_NOISE_COUNTS)..=i32::from(SIM_NOISE_COUNTS));
        let sample = (scaled as i32 + noise).clamp(0, i32::from(ADC_MAX_COUNTS));
        Ok(sample as u16)
    }
}

impl GainControl for SimFrontEnd {
    fn set_wiper(&mut self, pot: u8, value: u8) -> Result<(), AdcError> {
        let slot = self.wipers.get_mut(pot as usize).ok_or(AdcError::BadChannel(pot))?;
        *slot = value;
        log::debug!("Digipot {} wiper set to {}", pot, value);
        Ok(())
    }
}
