// FlexZone — Shared Data Types
// Rep and set records produced by the detector, plus the accelerometer
// sample shape shared between the IMU driver and its streaming task.

use crate::config::{ACCEL_WIRE_LEN, EMG_REP_CAPACITY, EMG_SET_CAPACITY};
use crate::error::CapacityError;

// ---------------------------------------------------------------------------
// Rep Record (all widths in milliseconds)
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepRecord {
    pub pulse_width_ms: u32,
    pub dead_width_ms: u32,
    pub concentric_ms: u32,
    pub eccentric_ms: u32,
}

// ---------------------------------------------------------------------------
// Set Statistics — bounded rep storage for one set
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetStats {
    reps: [RepRecord; EMG_REP_CAPACITY],
    num_reps: u8,
}

impl SetStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rep, returning its slot index. A full set refuses the rep.
    pub fn push_rep(&mut self, rep: RepRecord) -> Result<u8, CapacityError> {
        let idx = self.num_reps as usize;
        if idx >= EMG_REP_CAPACITY {
            return Err(CapacityError { capacity: EMG_REP_CAPACITY });
        }
        self.reps[idx] = rep;
        self.num_reps += 1;
        Ok(idx as u8)
    }

    pub fn num_reps(&self) -> u8 {
        self.num_reps
    }

    pub fn is_full(&self) -> bool {
        self.num_reps as usize >= EMG_REP_CAPACITY
    }

    pub fn rep(&self, idx: usize) -> Option<&RepRecord> {
        self.reps[..self.num_reps as usize].get(idx)
    }

    /// The filled portion of the rep array.
    pub fn reps(&self) -> &[RepRecord] {
        &self.reps[..self.num_reps as usize]
    }

    pub fn mean_pulse_width_ms(&self) -> u32 {
        mean(self.reps().iter().map(|r| r.pulse_width_ms))
    }

    pub fn mean_dead_width_ms(&self) -> u32 {
        mean(self.reps().iter().map(|r| r.dead_width_ms))
    }
}

fn mean(values: impl Iterator<Item = u32>) -> u32 {
    let mut sum: u64 = 0;
    let mut count: u64 = 0;
    for v in values {
        sum += u64::from(v);
        count += 1;
    }
    if count == 0 {
        0
    } else {
        (sum / count) as u32
    }
}

// ---------------------------------------------------------------------------
// Set Log — completed sets for the session
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Default)]
pub struct SetLog {
    sets: [SetStats; EMG_SET_CAPACITY],
    len: u8,
}

impl SetLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len as usize >= EMG_SET_CAPACITY
    }

    pub fn get(&self, idx: usize) -> Option<&SetStats> {
        self.sets[..self.len as usize].get(idx)
    }

    /// Append a completed set. A full log refuses it.
    pub fn push(&mut self, set: SetStats) -> Result<(), CapacityError> {
        let idx = self.len as usize;
        if idx >= EMG_SET_CAPACITY {
            return Err(CapacityError { capacity: EMG_SET_CAPACITY });
        }
        self.sets[idx] = set;
        self.len += 1;
        Ok(())
    }

    /// Append a completed set, evicting the oldest when full.
    pub fn push_rolling(&mut self, set: SetStats) {
        if self.push(set).is_err() {
            self.sets.copy_within(1.., 0);
            self.sets[EMG_SET_CAPACITY - 1] = set;
        }
    }
}

// ---------------------------------------------------------------------------
// Accelerometer Sample (raw 6-axis IMU counts)
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccelSample {
    pub ax: i16,
    pub ay: i16,
    pub az: i16,
    pub gx: i16,
    pub gy: i16,
    pub gz: i16,
}

impl AccelSample {
    /// Little-endian wire encoding, axis order ax..gz.
    pub fn to_wire(&self) -> [u8; ACCEL_WIRE_LEN] {
        let mut out = [0u8; ACCEL_WIRE_LEN];
        for (chunk, axis) in out
            .chunks_exact_mut(2)
            .zip([self.ax, self.ay, self.az, self.gx, self.gy, self.gz])
        {
            chunk.copy_from_slice(&axis.to_le_bytes());
        }
        out
    }
}
