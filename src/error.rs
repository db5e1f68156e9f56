// FlexZone — Error Types
// Typed failures for the acquisition, detection, and link layers. Faults are
// local: callers log and continue, nothing here unwinds a task.

use std::error::Error;
use std::fmt::Display;

// ---------------------------------------------------------------------------
// Bounded-buffer overflow
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityError {
    pub capacity: usize,
}

impl Display for CapacityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Buffer is full at capacity {}", self.capacity)
    }
}

impl Error for CapacityError {}

// ---------------------------------------------------------------------------
// Analog front end
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdcError {
    Busy,
    BadChannel(u8),
}

impl Display for AdcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdcError::Busy => write!(f, "ADC conversion in progress, sample unavailable"),
            AdcError::BadChannel(ch) => write!(f, "ADC channel {} does not exist", ch),
        }
    }
}

impl Error for AdcError {}

// ---------------------------------------------------------------------------
// Inertial sensor
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImuError {
    Bus,
}

impl Display for ImuError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImuError::Bus => write!(f, "IMU bus transaction failed"),
        }
    }
}

impl Error for ImuError {}

// ---------------------------------------------------------------------------
// Packetizer / transport
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketError {
    InvalidParam,
    InvalidLen { len: usize, max: usize },
    QueueFull,
    LinkDown,
}

impl Display for PacketError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PacketError::InvalidParam => write!(f, "Packet parameter is invalid"),
            PacketError::InvalidLen { len, max } => {
                write!(f, "Payload of {} bytes exceeds the {} byte limit", len, max)
            }
            PacketError::QueueFull => write!(f, "Transport queue is full, frame refused"),
            PacketError::LinkDown => write!(f, "Link task is gone, frame refused"),
        }
    }
}

impl Error for PacketError {}
