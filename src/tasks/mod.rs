// FlexZone — Task Bodies
// One free function per spawned thread: sampling and detection on the EMG
// side, streaming on the accel side.

pub mod accel;
pub mod emg;
