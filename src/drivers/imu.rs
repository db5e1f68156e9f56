// FlexZone — Inertial Sensor
//
// The accel stream only needs raw 6-axis counts once per period; the trait
// keeps the streaming task independent of the bus the part hangs off.
// `SimImu` produces gravity plus a slow wobble for host runs.

use std::time::Instant;

use crate::error::ImuError;
use crate::events::AccelSample;

// Sim waveform shape: raw counts at the ±8 g / ±500 °/s register scales.
const SIM_GRAVITY_COUNTS: i16 = 4096; // 1 g on the z axis
const SIM_ACCEL_WOBBLE: i32 = 300;
const SIM_GYRO_WOBBLE: i32 = 40;
const SIM_BUS_FAULT_ONE_IN: u32 = 500;

pub trait ImuReader {
    /// One burst read of all six axes.
    fn read_sample(&mut self) -> Result<AccelSample, ImuError>;
}

// ---------------------------------------------------------------------------
// Simulated IMU
// ---------------------------------------------------------------------------
pub struct SimImu {
    started: Instant,
}

impl SimImu {
    pub fn new() -> Self {
        Self { started: Instant::now() }
    }
}

impl Default for SimImu {
    fn default() -> Self {
        Self::new()
    }
}

impl ImuReader for SimImu {
    fn read_sample(&mut self) -> Result<AccelSample, ImuError> {
        if rand::random_range(0..SIM_BUS_FAULT_ONE_IN) == 0 {
            return Err(ImuError::Bus);
        }

        let t = self.started.elapsed().as_millis() as u64;
        Ok(AccelSample {
            ax: triangle(t, 1_700, SIM_ACCEL_WOBBLE),
            ay: triangle(t, 2_300, SIM_ACCEL_WOBBLE / 2),
            az: SIM_GRAVITY_COUNTS.saturating_add(triangle(t, 2_000, SIM_ACCEL_WOBBLE / 3)),
            gx: triangle(t, 1_300, SIM_GYRO_WOBBLE),
            gy: triangle(t, 1_900, SIM_GYRO_WOBBLE),
            gz: triangle(t, 2_900, SIM_GYRO_WOBBLE / 2),
        })
    }
}

/// Symmetric triangle wave: sweeps -amplitude..=amplitude over one period.
fn triangle(t_ms: u64, period_ms: u64, amplitude: i32) -> i16 {
    let pos = (t_ms % period_ms) as i32;
    let half = (period_ms / 2) as i32;
    let ramp = if pos < half { pos } else { 2 * half - pos };
    (2 * amplitude * ramp / half - amplitude) as i16
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangle_spans_its_amplitude() {
        assert_eq!(triangle(0, 2_000, 300), -300);
        assert_eq!(triangle(1_000, 2_000, 300), 300);
        assert_eq!(triangle(500, 2_000, 300), 0);
        for t in 0..2_000 {
            let v = i32::from(triangle(t, 2_000, 300));
            assert!((-300..=300).contains(&v));
        }
    }

    #[test]
    fn test_sim_reads_hover_around_gravity() {
        let mut imu = SimImu::new();
        for _ in 0..50 {
            if let Ok(sample) = imu.read_sample() {
                let dz = i32::from(sample.az) - i32::from(SIM_GRAVITY_COUNTS);
                assert!(dz.abs() <= SIM_ACCEL_WOBBLE / 3);
            }
        }
    }
}
