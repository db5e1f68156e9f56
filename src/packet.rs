// FlexZone — Wireless Packet Framing
// Frames carried over the 20-byte stream characteristic: a two-byte header
// (packet type, payload length) followed by up to 18 payload bytes. Payload
// records are tagged by their first byte so the companion app can demux rep
// records, set summaries, and raw sample previews on one stream.

use crate::config::{EMG_MAX_PAYLOAD, EMG_STREAM_LEN, PACKET_HEADER_LEN, RAW_PREVIEW_SAMPLES};
use crate::error::PacketError;
use crate::events::{RepRecord, SetStats};

// ---------------------------------------------------------------------------
// Packet Types (header byte 0)
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    Data = 0,
    Config = 1,
}

impl PacketType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(PacketType::Data),
            1 => Some(PacketType::Config),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Payload Record Tags (payload byte 0 on the EMG stream)
// ---------------------------------------------------------------------------
pub const REC_REP: u8 = 0x01;
pub const REC_SET_SUMMARY: u8 = 0x02;
pub const REC_RAW_PREVIEW: u8 = 0x03;

pub const REP_RECORD_LEN: usize = 2 + 4 * 4; // tag, rep index, four u32 widths
pub const SET_SUMMARY_LEN: usize = 3 + 4 * 2; // tag, set index, rep count, two u32 means
pub const RAW_PREVIEW_LEN: usize = 1 + 2 * RAW_PREVIEW_SAMPLES; // tag plus u16 samples

// ---------------------------------------------------------------------------
// Packet
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    packet_type: PacketType,
    len: u8,
    frame: [u8; EMG_STREAM_LEN],
}

impl Packet {
    /// Frame a payload. Empty payloads are refused, as are payloads that do
    /// not fit the stream characteristic after the two header bytes.
    pub fn new(packet_type: PacketType, payload: &[u8]) -> Result<Self, PacketError> {
        if payload.is_empty() {
            return Err(PacketError::InvalidParam);
        }
        if payload.len() > EMG_MAX_PAYLOAD {
            return Err(PacketError::InvalidLen { len: payload.len(), max: EMG_MAX_PAYLOAD });
        }
        let mut frame = [0u8; EMG_STREAM_LEN];
        frame[0] = packet_type as u8;
        frame[1] = payload.len() as u8;
        frame[PACKET_HEADER_LEN..PACKET_HEADER_LEN + payload.len()].copy_from_slice(payload);
        Ok(Self { packet_type, len: payload.len() as u8, frame })
    }

    /// Rebuild a packet from received characteristic bytes.
    pub fn from_wire(bytes: &[u8]) -> Result<Self, PacketError> {
        if bytes.len() < PACKET_HEADER_LEN {
            return Err(PacketError::InvalidParam);
        }
        let packet_type = PacketType::from_byte(bytes[0]).ok_or(PacketError::InvalidParam)?;
        let len = bytes[1] as usize;
        if len > EMG_MAX_PAYLOAD {
            return Err(PacketError::InvalidLen { len, max: EMG_MAX_PAYLOAD });
        }
        if bytes.len() < PACKET_HEADER_LEN + len {
            return Err(PacketError::InvalidLen { len, max: bytes.len() - PACKET_HEADER_LEN });
        }
        Self::new(packet_type, &bytes[PACKET_HEADER_LEN..PACKET_HEADER_LEN + len])
    }

    pub fn packet_type(&self) -> PacketType {
        self.packet_type
    }

    pub fn payload_len(&self) -> usize {
        self.len as usize
    }

    pub fn payload(&self) -> &[u8] {
        &self.frame[PACKET_HEADER_LEN..PACKET_HEADER_LEN + self.len as usize]
    }

    /// Header plus payload, ready for the link.
    pub fn wire(&self) -> &[u8] {
        &self.frame[..PACKET_HEADER_LEN + self.len as usize]
    }
}

// ---------------------------------------------------------------------------
// Payload Encoders
// ---------------------------------------------------------------------------

/// One accepted rep: index plus pulse/dead/concentric/eccentric widths.
pub fn encode_rep_record(index: u8, rep: &RepRecord) -> [u8; REP_RECORD_LEN] {
    let mut out = [0u8; REP_RECORD_LEN];
    out[0] = REC_REP;
    out[1] = index;
    let mut at = 2;
    for width in [rep.pulse_width_ms, rep.dead_width_ms, rep.concentric_ms, rep.eccentric_ms] {
        out[at..at + 4].copy_from_slice(&width.to_le_bytes());
        at += 4;
    }
    out
}

/// End-of-set digest: rep count plus mean pulse/dead widths.
pub fn encode_set_summary(set_index: u8, stats: &SetStats) -> [u8; SET_SUMMARY_LEN] {
    let mut out = [0u8; SET_SUMMARY_LEN];
    out[0] = REC_SET_SUMMARY;
    out[1] = set_index;
    out[2] = stats.num_reps();
    out[3..7].copy_from_slice(&stats.mean_pulse_width_ms().to_le_bytes());
    out[7..11].copy_from_slice(&stats.mean_dead_width_ms().to_le_bytes());
    out
}

/// Leading slice samples as little-endian u16, for live signal display.
pub fn encode_raw_preview(samples: &[u16]) -> [u8; RAW_PREVIEW_LEN] {
    let mut out = [0u8; RAW_PREVIEW_LEN];
    out[0] = REC_RAW_PREVIEW;
    for (chunk, sample) in out[1..]
        .chunks_exact_mut(2)
        .zip(samples.iter().take(RAW_PREVIEW_SAMPLES))
    {
        chunk.copy_from_slice(&sample.to_le_bytes());
    }
    out
}

// ---------------------------------------------------------------------------
// Peer Configuration Commands (Config packets, device-bound)
// ---------------------------------------------------------------------------
pub const PARAM_THRESHOLD_HIGH: u8 = 0x01;
pub const PARAM_THRESHOLD_LOW: u8 = 0x02;
pub const PARAM_GAIN: u8 = 0x03;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigCommand {
    SetThresholdHigh(u16),
    SetThresholdLow(u16),
    SetGain(u8),
}

impl Packet {
    /// Decode a device-bound configuration write. Only `Config` packets
    /// carry commands; anything malformed is an invalid parameter.
    pub fn parse_config(&self) -> Result<ConfigCommand, PacketError> {
        if self.packet_type != PacketType::Config {
            return Err(PacketError::InvalidParam);
        }
        let payload = self.payload();
        match (payload[0], payload.len()) {
            (PARAM_THRESHOLD_HIGH, 3) => {
                Ok(ConfigCommand::SetThresholdHigh(u16::from_le_bytes([payload[1], payload[2]])))
            }
            (PARAM_THRESHOLD_LOW, 3) => {
                Ok(ConfigCommand::SetThresholdLow(u16::from_le_bytes([payload[1], payload[2]])))
            }
            (PARAM_GAIN, 2) => Ok(ConfigCommand::SetGain(payload[1])),
            _ => Err(PacketError::InvalidParam),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_every_legal_length() {
        for len in 1..=EMG_MAX_PAYLOAD {
            let payload: Vec<u8> = (0..len as u8).collect();
            let packet = Packet::new(PacketType::Data, &payload).unwrap();
            assert_eq!(packet.wire()[0], 0);
            assert_eq!(packet.wire()[1] as usize, len);
            assert_eq!(packet.wire().len(), PACKET_HEADER_LEN + len);

            let back = Packet::from_wire(packet.wire()).unwrap();
            assert_eq!(back, packet);
            assert_eq!(back.payload(), &payload[..]);
        }
    }

    #[test]
    fn test_empty_payload_refused() {
        assert_eq!(Packet::new(PacketType::Data, &[]), Err(PacketError::InvalidParam));
    }

    #[test]
    fn test_oversized_payload_refused() {
        let payload = [0u8; EMG_MAX_PAYLOAD + 1];
        assert_eq!(
            Packet::new(PacketType::Data, &payload),
            Err(PacketError::InvalidLen { len: EMG_MAX_PAYLOAD + 1, max: EMG_MAX_PAYLOAD })
        );
    }

    #[test]
    fn test_from_wire_rejects_bad_type() {
        assert_eq!(Packet::from_wire(&[7, 1, 0]), Err(PacketError::InvalidParam));
    }

    #[test]
    fn test_from_wire_rejects_truncated_frame() {
        // Header claims 4 payload bytes, only 2 present.
        let err = Packet::from_wire(&[0, 4, 0xAA, 0xBB]).unwrap_err();
        assert_eq!(err, PacketError::InvalidLen { len: 4, max: 2 });
    }

    #[test]
    fn test_rep_record_layout() {
        let rep = RepRecord {
            pulse_width_ms: 300,
            dead_width_ms: 0x0102_0304,
            concentric_ms: 150,
            eccentric_ms: 150,
        };
        let bytes = encode_rep_record(3, &rep);
        assert_eq!(bytes.len(), EMG_MAX_PAYLOAD);
        assert_eq!(bytes[0], REC_REP);
        assert_eq!(bytes[1], 3);
        assert_eq!(bytes[2..6], 300u32.to_le_bytes());
        assert_eq!(bytes[6..10], [0x04, 0x03, 0x02, 0x01]);
        assert_eq!(bytes[10..14], 150u32.to_le_bytes());
        assert_eq!(bytes[14..18], 150u32.to_le_bytes());
    }

    #[test]
    fn test_set_summary_layout() {
        let mut stats = SetStats::new();
        stats
            .push_rep(RepRecord {
                pulse_width_ms: 300,
                dead_width_ms: 100,
                concentric_ms: 150,
                eccentric_ms: 150,
            })
            .unwrap();
        stats
            .push_rep(RepRecord {
                pulse_width_ms: 500,
                dead_width_ms: 300,
                concentric_ms: 250,
                eccentric_ms: 250,
            })
            .unwrap();

        let bytes = encode_set_summary(2, &stats);
        assert_eq!(bytes[0], REC_SET_SUMMARY);
        assert_eq!(bytes[1], 2);
        assert_eq!(bytes[2], 2);
        assert_eq!(bytes[3..7], 400u32.to_le_bytes());
        assert_eq!(bytes[7..11], 200u32.to_le_bytes());
    }

    #[test]
    fn test_raw_preview_layout() {
        let samples = [500u16, 1700, 4095, 0, 1, 2, 3, 4, 9999, 9999];
        let bytes = encode_raw_preview(&samples);
        assert_eq!(bytes[0], REC_RAW_PREVIEW);
        assert_eq!(bytes[1..3], 500u16.to_le_bytes());
        assert_eq!(bytes[3..5], 1700u16.to_le_bytes());
        assert_eq!(bytes[5..7], 4095u16.to_le_bytes());
        // Only the first eight samples are carried.
        assert_eq!(bytes[15..17], 4u16.to_le_bytes());
        assert_eq!(bytes.len(), RAW_PREVIEW_LEN);
    }

    #[test]
    fn test_parse_config_commands() {
        let high = Packet::new(PacketType::Config, &[PARAM_THRESHOLD_HIGH, 0x40, 0x06]).unwrap();
        assert_eq!(high.parse_config(), Ok(ConfigCommand::SetThresholdHigh(1600)));

        let low = Packet::new(PacketType::Config, &[PARAM_THRESHOLD_LOW, 0x20, 0x03]).unwrap();
        assert_eq!(low.parse_config(), Ok(ConfigCommand::SetThresholdLow(800)));

        let gain = Packet::new(PacketType::Config, &[PARAM_GAIN, 20]).unwrap();
        assert_eq!(gain.parse_config(), Ok(ConfigCommand::SetGain(20)));
    }

    #[test]
    fn test_parse_config_rejects_malformed() {
        // Wrong length for the parameter.
        let short = Packet::new(PacketType::Config, &[PARAM_THRESHOLD_HIGH, 0x40]).unwrap();
        assert_eq!(short.parse_config(), Err(PacketError::InvalidParam));

        // Unknown parameter id.
        let unknown = Packet::new(PacketType::Config, &[0x7F, 1, 2]).unwrap();
        assert_eq!(unknown.parse_config(), Err(PacketError::InvalidParam));

        // Data packets never carry commands.
        let data = Packet::new(PacketType::Data, &[PARAM_GAIN, 20]).unwrap();
        assert_eq!(data.parse_config(), Err(PacketError::InvalidParam));
    }
}
