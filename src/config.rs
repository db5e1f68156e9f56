// FlexZone — Hardware & System Configuration
// EMG acquisition geometry, detection thresholds, and link framing limits.

// ---------------------------------------------------------------------------
// EMG Acquisition
// ---------------------------------------------------------------------------
pub const EMG_SAMPLE_PERIOD_MS: u64 = 50;     // 20 Hz averaged sample rate
pub const EMG_READS_PER_SAMPLE: usize = 4;    // ADC conversions per averaged sample
pub const EMG_SAMPLES_PER_SLICE: usize = 50;  // 2.5 s of signal per slice

// ---------------------------------------------------------------------------
// Rep Detection (12-bit ADC counts / milliseconds)
// ---------------------------------------------------------------------------
pub const EMG_THRESHOLD_HIGH: u16 = 1600;     // contraction entry threshold
pub const EMG_THRESHOLD_LOW: u16 = 800;       // contraction exit threshold
pub const EMG_MIN_PULSE_WIDTH_MS: u32 = 250;  // shorter pulses are noise

// ---------------------------------------------------------------------------
// Set Accounting
// ---------------------------------------------------------------------------
pub const EMG_REP_CAPACITY: usize = 20;       // reps retained per set
pub const EMG_SET_CAPACITY: usize = 10;       // completed sets retained
pub const SET_IDLE_TIMEOUT_MS: u32 = 30_000;  // dead time that ends a set
pub const SET_MAX_DURATION_MS: u32 = 600_000; // hard cap on one set (10 min)

// ---------------------------------------------------------------------------
// Accelerometer Stream
// ---------------------------------------------------------------------------
pub const ACCEL_SAMPLE_PERIOD_MS: u64 = 200;  // 5 Hz motion stream

// ---------------------------------------------------------------------------
// Link Framing
// ---------------------------------------------------------------------------
pub const EMG_STREAM_LEN: usize = 20;                              // stream characteristic size
pub const PACKET_HEADER_LEN: usize = 2;                            // type byte + length byte
pub const EMG_MAX_PAYLOAD: usize = EMG_STREAM_LEN - PACKET_HEADER_LEN; // 18
pub const TRANSPORT_QUEUE_DEPTH: usize = 8;                        // pending outbound frames
pub const RAW_PREVIEW_SAMPLES: usize = 8;                          // slice samples per raw frame
pub const ACCEL_WIRE_LEN: usize = 12;                              // six i16 axes, little endian

// ---------------------------------------------------------------------------
// Analog Front End
// ---------------------------------------------------------------------------
pub const ADC_BITS: u32 = 12;
pub const ADC_MAX_COUNTS: u16 = (1 << ADC_BITS) - 1; // 4095
pub const DIGIPOT_DEFAULT_WIPER: u8 = 20;            // boot-time gain setting

// ---------------------------------------------------------------------------
// Task Stack Sizes (bytes)
// ---------------------------------------------------------------------------
pub const STACK_SAMPLER: usize = 64 * 1024;
pub const STACK_DETECTOR: usize = 128 * 1024;
pub const STACK_ACCEL: usize = 64 * 1024;
pub const STACK_LINK: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Simulated Front End (host stand-in drivers)
// ---------------------------------------------------------------------------
pub const SIM_CONTRACTION_PERIOD_MS: u64 = 5_000; // one rep cycle
pub const SIM_CONTRACTION_HOLD_MS: u64 = 2_000;   // contraction portion of the cycle
pub const SIM_ACTIVE_LEVEL: u16 = 1800;           // mean contraction amplitude
pub const SIM_REST_LEVEL: u16 = 400;              // mean resting amplitude
pub const SIM_NOISE_COUNTS: u16 = 150;            // ± noise on either level
pub const SIM_BUSY_ONE_IN: u32 = 400;             // odds of a Busy conversion
