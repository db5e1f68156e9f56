// FlexZone — Hardware Collaborators
// Narrow interfaces over the analog front end and the inertial sensor, plus
// simulated implementations so the pipeline runs on a development host.

pub mod adc;
pub mod imu;
