// FlexZone — EMG Pipeline
// Slice acquisition and rep detection. One slice buffer circulates between
// the two halves over a pair of capacity-1 channels, so whichever side holds
// the buffer owns it outright.

pub mod detector;
pub mod sampler;

use crate::config::EMG_SAMPLES_PER_SLICE;

/// One detector work unit: a fully populated window of averaged samples.
pub type SampleSlice = [u16; EMG_SAMPLES_PER_SLICE];
