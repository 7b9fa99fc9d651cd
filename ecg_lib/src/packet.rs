/** ------------------------------------------------------------
 * Packet decoding from the raw hex stream
 * ------------------------------------------------------------- */
use crate::errors::PipelineError;
use crate::util::extract_hex_field;
use log::{debug, warn};

/// Number of hex characters per packet (17 bytes)
pub const PACKET_HEX_LEN: usize = 34;

#[rustfmt::skip]
const HEADER_HEX_LEN   : usize = 8;  // bytes 0-3, header and sequence
#[rustfmt::skip]
const CHANNEL_1_HEX_LEN: usize = 4;  // bytes 4-5, big-endian u16

/**
 * A single validated packet of the stream
 *
 * Only the channel 1 field is decoded, the header and the remaining
 * channels stay opaque.
 */
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RawPacket<'a> {
    hex: &'a str,
}

impl<'a> RawPacket<'a> {
    /**
     * Validate a packet chunk
     *
     * \param chunk    34 hex characters
     * \param position zero-based packet position in the stream, for errors
     */
    pub fn parse(chunk: &'a str, position: usize) -> Result<Self, PipelineError> {
        if chunk.len() != PACKET_HEX_LEN {
            return Err(PipelineError::MalformedPacket {
                position,
                reason: format!(
                    "expected {} hex characters, got {}",
                    PACKET_HEX_LEN,
                    chunk.len()
                ),
            });
        }

        if let Some(offset) = chunk.bytes().position(|b| !b.is_ascii_hexdigit()) {
            return Err(PipelineError::MalformedPacket {
                position,
                reason: format!("non-hex character at offset {}", offset),
            });
        }

        Ok(Self { hex: chunk })
    }

    /**
     * Channel 1 value, the 4 hex characters following the header
     */
    pub fn channel_1(&self) -> u16 {
        // Validated in parse, the field is always present and hex
        extract_hex_field(self.hex, HEADER_HEX_LEN, CHANNEL_1_HEX_LEN).unwrap_or_default()
    }
}

/**
 * Decoded channel 1 value of one packet
 */
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Measurement {
    /// Zero-based position of the source packet in the stream
    pub packet_position: usize,
    pub value: u16,
}

/**
 * Decode the channel 1 measurements of a raw hex stream
 *
 * Surrounding whitespace is ignored. The stream length must be a positive
 * multiple of the packet size. Packets failing validation are skipped and
 * produce no measurement; the remaining measurements keep arrival order.
 */
pub fn decode(raw: &str) -> Result<Vec<Measurement>, PipelineError> {
    let raw = raw.trim();
    if raw.is_empty() || raw.len() % PACKET_HEX_LEN != 0 {
        return Err(PipelineError::InvalidLength {
            length: raw.len(),
            packet_size: PACKET_HEX_LEN,
        });
    }

    let num_packets = raw.len() / PACKET_HEX_LEN;
    let mut measurements = Vec::with_capacity(num_packets);

    // Chunk on bytes. Non-ASCII input may split a character across two
    // chunks, which then fail the UTF-8 check and are skipped.
    for (position, chunk) in raw.as_bytes().chunks(PACKET_HEX_LEN).enumerate() {
        let packet = std::str::from_utf8(chunk)
            .map_err(|_| PipelineError::MalformedPacket {
                position,
                reason: "packet is not ASCII".to_string(),
            })
            .and_then(|chunk| RawPacket::parse(chunk, position));

        match packet {
            Ok(packet) => measurements.push(Measurement {
                packet_position: position,
                value: packet.channel_1(),
            }),
            Err(e) => warn!("Skipping packet: {}", e),
        }
    }

    debug!(
        "Decoded {} of {} packets",
        measurements.len(),
        num_packets
    );
    Ok(measurements)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PACKET: &str = "A55A02B3029D01FF01FA01F501F001E900";

    #[test]
    fn extracts_channel_1() {
        let measurements = decode(PACKET).unwrap();
        assert_eq!(
            measurements,
            vec![Measurement {
                packet_position: 0,
                value: 669
            }]
        );
    }

    #[test]
    fn keeps_arrival_order() {
        let raw = format!(
            "{}{}{}",
            PACKET,
            "A55A03B30001000000000000000000000000",
            "A55A04B3FFFF0000000000000000000000"
        );
        // Middle chunk is 36 characters long, making the total invalid
        assert!(decode(&raw).is_err());

        let raw = format!(
            "{}{}{}",
            PACKET, "A55A03B300010000000000000000000000", "a55a04b3ffff0000000000000000000000"
        );
        let values: Vec<u16> = decode(&raw).unwrap().iter().map(|m| m.value).collect();
        assert_eq!(values, vec![669, 1, 0xFFFF]);
    }

    #[test]
    fn rejects_bad_length() {
        let result = decode(&PACKET[..33]);
        if let Err(PipelineError::InvalidLength {
            length,
            packet_size,
        }) = result
        {
            assert_eq!(length, 33);
            assert_eq!(packet_size, 34);
        } else {
            panic!("Expected InvalidLength error, got {:?}", result);
        }

        assert!(decode("").unwrap_err().is_format_error());
    }

    #[test]
    fn trims_line_endings() {
        let raw = format!("{}\n", PACKET);
        assert_eq!(decode(&raw).unwrap().len(), 1);
    }

    #[test]
    fn skips_malformed_packets() {
        let raw = format!("{}{}", "A55A02B3029DXXFF01FA01F501F001E900", PACKET);
        let measurements = decode(&raw).unwrap();
        assert_eq!(measurements.len(), 1);
        assert_eq!(measurements[0].packet_position, 1);
        assert_eq!(measurements[0].value, 669);
    }

    #[test]
    fn all_malformed_packets_decode_to_nothing() {
        let raw = "A55A02B3029DXXFF01FA01F501F001E900".repeat(3);
        assert!(decode(&raw).unwrap().is_empty());
    }

    #[test]
    fn parse_reports_position() {
        match RawPacket::parse("A55A02B3029D01FF01FA01F501F001E9", 7) {
            Err(PipelineError::MalformedPacket { position, .. }) => assert_eq!(position, 7),
            other => panic!("Expected MalformedPacket error, got {:?}", other),
        }

        let packet = RawPacket::parse(PACKET, 0).unwrap();
        assert_eq!(packet.channel_1(), 0x029D);
    }
}
