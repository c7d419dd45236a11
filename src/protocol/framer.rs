//! # Byte-Stream Framer
//!
//! Splits a continuously arriving byte stream into candidate frames.
//!
//! Two transport conventions are supported:
//!
//! - [`Convention::Direct`]: wired serial or radio link. Raw frames follow each
//!   other; a region closes as soon as the buffer ends with `\n\r`.
//! - [`Convention::Tunneled`]: the WiFi bridge module wraps every datagram it
//!   receives in an unsolicited notification:
//!
//! ```text
//! \r\n+IPD,<decimal length>:<length bytes>
//! ```
//!
//! The envelope is stripped and the `length` bytes after the colon form the
//! region.
//!
//! Inside a region every span that starts with an accepted type tag and ends
//! with a `\n\r` followed by another accepted tag (or the end of the region)
//! is emitted as one candidate frame, in arrival order. The receive buffer is
//! reset after every region, after an overflow and after a malformed
//! envelope. None of these conditions is reported to the caller other than
//! by the absence of frames; [`Framer::stats`] counts them.

use bytes::{BufMut, BytesMut};
use serde::Deserialize;
use tracing::{debug, trace};

use super::packet::{PacketType, FRAME_TERMINATOR};

/// Default receive buffer capacity in bytes
pub const DEFAULT_BUFFER_CAPACITY: usize = 60;

/// Literal that opens every WiFi bridge receive notification
pub const ENVELOPE_PREFIX: &[u8] = b"\r\n+IPD,";

/// Longest decimal length field accepted in an envelope
const MAX_LENGTH_DIGITS: usize = 4;

/// Trailer the bridge may leave after the datagram bytes
const ENVELOPE_TRAILER: [u8; 2] = [b'\r', b'\n'];

/// Transport envelope convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Convention {
    /// No envelope, regions end with `\n\r`
    Direct,
    /// `\r\n+IPD,<len>:` envelope from the WiFi bridge module
    Tunneled,
}

/// Framer construction parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramerConfig {
    /// Envelope convention of the transport
    pub convention: Convention,

    /// Receive buffer capacity in bytes
    pub capacity: usize,

    /// Packet types that may start a frame
    pub accepted: Vec<PacketType>,
}

impl FramerConfig {
    /// Framer for the host side: accepts telemetry and error reports
    pub fn host(convention: Convention) -> Self {
        Self {
            convention,
            capacity: DEFAULT_BUFFER_CAPACITY,
            accepted: PacketType::FROM_ROBOT.to_vec(),
        }
    }

    /// Framer for the robot side: accepts rate and motor commands
    pub fn robot(convention: Convention) -> Self {
        Self {
            convention,
            capacity: DEFAULT_BUFFER_CAPACITY,
            accepted: PacketType::TO_ROBOT.to_vec(),
        }
    }

    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

/// Drop and delivery counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FramerStats {
    /// Candidate frames emitted
    pub frames: u64,

    /// Buffer resets caused by running out of capacity
    pub overflows: u64,

    /// Envelopes rejected for a bad prefix, length or missing colon
    pub envelope_errors: u64,

    /// Closed regions that contained no recognizable frame
    pub empty_regions: u64,
}

/// Envelope parse position for [`Convention::Tunneled`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Envelope {
    /// Matching the literal prefix
    Prefix,
    /// Reading decimal length digits up to the colon
    Length { declared: usize, digits: usize },
    /// Collecting `declared` bytes starting at buffer offset `start`
    Payload { start: usize, declared: usize },
}

/// Byte-stream framer
///
/// Owns exactly one transport's receive state. Not meant to be shared
/// between concurrent producers.
///
/// # Examples
///
/// ```
/// use sbr_link::protocol::framer::{Convention, Framer, FramerConfig};
///
/// let mut framer = Framer::new(FramerConfig::host(Convention::Direct));
/// let mut frames = Vec::new();
///
/// framer.ingest(&[0xEE, 0x01], |frame| frames.push(frame.to_vec()));
/// assert!(frames.is_empty());
///
/// framer.ingest(&[0x45, b'\n', b'\r'], |frame| frames.push(frame.to_vec()));
/// assert_eq!(frames, vec![vec![0xEE, 0x01, 0x45, b'\n', b'\r']]);
/// ```
#[derive(Debug)]
pub struct Framer {
    convention: Convention,
    capacity: usize,
    tags: Vec<u8>,
    buffer: BytesMut,
    envelope: Envelope,
    stats: FramerStats,
}

impl Framer {
    pub fn new(config: FramerConfig) -> Self {
        Self {
            convention: config.convention,
            capacity: config.capacity,
            tags: config.accepted.iter().map(|packet_type| packet_type.tag()).collect(),
            buffer: BytesMut::with_capacity(config.capacity),
            envelope: Envelope::Prefix,
            stats: FramerStats::default(),
        }
    }

    pub fn convention(&self) -> Convention {
        self.convention
    }

    pub fn stats(&self) -> FramerStats {
        self.stats
    }

    /// Number of bytes waiting for a boundary
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Discard buffered bytes and envelope state
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.envelope = Envelope::Prefix;
    }

    /// Feed newly received bytes
    ///
    /// `on_frame` is called once per candidate frame, with the span from the
    /// type tag through the `\n\r` terminator. Every candidate is taken as
    /// is; use [`Framer::ingest_checked`] to resynchronize past spans the
    /// caller cannot decode.
    pub fn ingest<F>(&mut self, chunk: &[u8], mut on_frame: F)
    where
        F: FnMut(&[u8]),
    {
        self.ingest_checked(chunk, |frame| {
            on_frame(frame);
            true
        });
    }

    /// Feed newly received bytes, letting the caller reject candidates
    ///
    /// `on_frame` returns whether it accepted the span. After a rejected
    /// span the scan resumes at the next tag inside it, so a stray tag byte
    /// in front of a valid frame does not hide that frame.
    pub fn ingest_checked<F>(&mut self, chunk: &[u8], mut on_frame: F)
    where
        F: FnMut(&[u8]) -> bool,
    {
        for &byte in chunk {
            if self.buffer.len() >= self.capacity {
                self.stats.overflows += 1;
                debug!("Receive buffer overflow, discarding {} bytes", self.buffer.len());
                self.reset();
            }

            self.buffer.put_u8(byte);

            match self.convention {
                Convention::Direct => self.check_direct(&mut on_frame),
                Convention::Tunneled => self.check_tunneled(byte, &mut on_frame),
            }
        }
    }

    fn check_direct<F>(&mut self, on_frame: &mut F)
    where
        F: FnMut(&[u8]) -> bool,
    {
        if self.buffer.len() > 3 && self.buffer.ends_with(&FRAME_TERMINATOR) {
            let found = extract_frames(&self.buffer, &self.tags, on_frame);
            self.close_region(found);
        }
    }

    fn check_tunneled<F>(&mut self, byte: u8, on_frame: &mut F)
    where
        F: FnMut(&[u8]) -> bool,
    {
        let len = self.buffer.len();

        match self.envelope {
            Envelope::Prefix => {
                if byte != ENVELOPE_PREFIX[len - 1] {
                    self.reject_envelope(byte);
                } else if len == ENVELOPE_PREFIX.len() {
                    self.envelope = Envelope::Length {
                        declared: 0,
                        digits: 0,
                    };
                }
            }
            Envelope::Length { declared, digits } => match byte {
                b'0'..=b'9' if digits < MAX_LENGTH_DIGITS => {
                    self.envelope = Envelope::Length {
                        declared: declared * 10 + usize::from(byte - b'0'),
                        digits: digits + 1,
                    };
                }
                b':' if digits > 0 && declared > 0 && len + declared <= self.capacity => {
                    self.envelope = Envelope::Payload {
                        start: len,
                        declared,
                    };
                }
                _ => self.reject_envelope(byte),
            },
            Envelope::Payload { start, declared } => {
                if len - start == declared {
                    let region = strip_trailer(&self.buffer[start..]);
                    let found = extract_frames(region, &self.tags, on_frame);
                    self.close_region(found);
                }
            }
        }
    }

    fn reject_envelope(&mut self, byte: u8) {
        if self.buffer.len() > 1 {
            self.stats.envelope_errors += 1;
            debug!(
                "Malformed envelope, discarding {} bytes: {:02X?}",
                self.buffer.len(),
                &self.buffer[..]
            );
        } else {
            trace!("Skipping byte 0x{:02X} outside of an envelope", byte);
        }

        self.reset();

        // The offending byte may open the next envelope
        if byte == ENVELOPE_PREFIX[0] {
            self.buffer.put_u8(byte);
        }
    }

    fn close_region(&mut self, found: usize) {
        if found == 0 {
            self.stats.empty_regions += 1;
            debug!("No frame found in {} byte region", self.buffer.len());
        } else {
            self.stats.frames += found as u64;
            trace!("Extracted {} frame(s)", found);
        }
        self.reset();
    }
}

/// Drop a trailing `\r\n` the bridge may include in the datagram
fn strip_trailer(region: &[u8]) -> &[u8] {
    region.strip_suffix(&ENVELOPE_TRAILER).unwrap_or(region)
}

/// Emit every tag-to-terminator span of a closed region
///
/// A `\n\r` only ends a frame when it is followed by another accepted tag or
/// by the end of the region, so terminator bytes inside a payload do not cut
/// the frame short. A span rejected by `on_frame` is rescanned from the byte
/// after its tag.
///
/// # Returns
///
/// * `usize` - Number of spans emitted, rejected ones included
fn extract_frames<F>(region: &[u8], tags: &[u8], on_frame: &mut F) -> usize
where
    F: FnMut(&[u8]) -> bool,
{
    let is_tag = |byte: u8| tags.contains(&byte);
    let mut found = 0;
    let mut start = 0;

    while start < region.len() {
        if !is_tag(region[start]) {
            start += 1;
            continue;
        }

        let end = (start + 1..region.len().saturating_sub(1))
            .find(|&j| {
                region[j] == FRAME_TERMINATOR[0]
                    && region[j + 1] == FRAME_TERMINATOR[1]
                    && (j + 2 == region.len() || is_tag(region[j + 2]))
            })
            .map(|j| j + 2);

        match end {
            Some(end) => {
                found += 1;
                if on_frame(&region[start..end]) {
                    start = end;
                } else {
                    trace!("Span at offset {} rejected, rescanning", start);
                    start += 1;
                }
            }
            // No later tag can reach a terminator either
            None => break,
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::decoder::decode_frame;
    use crate::protocol::encoder::encode_packet;
    use crate::protocol::messages::{ErrorCode, Message};
    use crate::protocol::packet::Packet;

    fn collect(framer: &mut Framer, chunk: &[u8]) -> Vec<Vec<u8>> {
        let mut frames = Vec::new();
        framer.ingest(chunk, |frame| frames.push(frame.to_vec()));
        frames
    }

    fn envelope(payload: &[u8]) -> Vec<u8> {
        let mut data = format!("\r\n+IPD,{}:", payload.len()).into_bytes();
        data.extend_from_slice(payload);
        data
    }

    fn motor_frame(left: i16, right: i16) -> Vec<u8> {
        encode_packet(&Message::SetMotors { left, right }.to_packet())
    }

    fn error_frame(code: ErrorCode) -> Vec<u8> {
        encode_packet(&Message::Error(code).to_packet())
    }

    #[test]
    fn test_direct_single_frame() {
        let mut framer = Framer::new(FramerConfig::host(Convention::Direct));
        let frame = error_frame(ErrorCode::SensorRead);

        let frames = collect(&mut framer, &frame);
        assert_eq!(frames, vec![frame]);
        assert_eq!(framer.buffered(), 0);
        assert_eq!(framer.stats().frames, 1);
    }

    #[test]
    fn test_direct_frame_split_across_chunks() {
        let mut framer = Framer::new(FramerConfig::robot(Convention::Direct));
        let frame = motor_frame(100, -100);

        let mut frames = Vec::new();
        for byte in &frame {
            frames.extend(collect(&mut framer, std::slice::from_ref(byte)));
        }

        assert_eq!(frames, vec![frame]);
    }

    #[test]
    fn test_direct_back_to_back_frames() {
        let mut framer = Framer::new(FramerConfig::robot(Convention::Direct));
        let first = motor_frame(10, 20);
        let second = encode_packet(&Message::SetRate { interval_us: 20_000 }.to_packet());

        let mut burst = first.clone();
        burst.extend_from_slice(&second);

        let frames = collect(&mut framer, &burst);
        assert_eq!(frames, vec![first, second]);
    }

    #[test]
    fn test_direct_skips_leading_noise() {
        let mut framer = Framer::new(FramerConfig::host(Convention::Direct));
        let frame = error_frame(ErrorCode::Other);

        let mut data = vec![0x55, 0x66, 0x77];
        data.extend_from_slice(&frame);

        let frames = collect(&mut framer, &data);
        assert_eq!(frames, vec![frame]);
    }

    #[test]
    fn test_direct_ignores_other_direction_tags() {
        let mut framer = Framer::new(FramerConfig::robot(Convention::Direct));

        let frames = collect(&mut framer, &error_frame(ErrorCode::SensorInit));
        assert!(frames.is_empty());
        assert_eq!(framer.stats().empty_regions, 1);
        assert_eq!(framer.buffered(), 0);
    }

    #[test]
    fn test_direct_overflow_recovery() {
        let mut framer = Framer::new(FramerConfig::robot(Convention::Direct));

        let frames = collect(&mut framer, &[0x55; 100]);
        assert!(frames.is_empty());
        assert_eq!(framer.stats().overflows, 1);
        assert_eq!(framer.buffered(), 100 - DEFAULT_BUFFER_CAPACITY);

        let frame = motor_frame(-255, 255);
        let frames = collect(&mut framer, &frame);
        assert_eq!(frames, vec![frame]);
    }

    #[test]
    fn test_direct_overflow_with_small_capacity() {
        let mut framer =
            Framer::new(FramerConfig::robot(Convention::Direct).with_capacity(10));

        collect(&mut framer, &[0x00; 25]);
        assert_eq!(framer.stats().overflows, 2);
        assert_eq!(framer.buffered(), 5);
    }

    #[test]
    fn test_tunneled_envelope_stripping() {
        let mut framer = Framer::new(FramerConfig::robot(Convention::Tunneled));
        let packet = Packet::new(PacketType::RateCommand, vec![0x01]).unwrap();
        let frame = encode_packet(&packet);
        assert_eq!(frame.len(), 5);

        let mut data = b"\r\n+IPD,5:".to_vec();
        data.extend_from_slice(&frame);

        let frames = collect(&mut framer, &data);
        assert_eq!(frames.len(), 1);
        assert_eq!(decode_frame(&frames[0]).unwrap(), packet);
        assert_eq!(framer.buffered(), 0);
    }

    #[test]
    fn test_tunneled_multiple_frames_in_one_envelope() {
        let mut framer = Framer::new(FramerConfig::robot(Convention::Tunneled));
        let first = encode_packet(&Message::SetRate { interval_us: 5_000 }.to_packet());
        let second = motor_frame(-30, 30);

        let mut payload = first.clone();
        payload.extend_from_slice(&second);

        let frames = collect(&mut framer, &envelope(&payload));
        assert_eq!(frames, vec![first, second]);
    }

    #[test]
    fn test_tunneled_consecutive_envelopes() {
        let mut framer = Framer::new(FramerConfig::robot(Convention::Tunneled));
        let first = motor_frame(1, 2);
        let second = motor_frame(3, 4);

        let mut data = envelope(&first);
        data.extend_from_slice(&envelope(&second));

        let frames = collect(&mut framer, &data);
        assert_eq!(frames, vec![first, second]);
    }

    #[test]
    fn test_tunneled_terminator_inside_payload() {
        let mut framer = Framer::new(FramerConfig::robot(Convention::Tunneled));
        // 0x0D0A little-endian puts "\n\r" at the start of the payload
        let frame = motor_frame(0x0D0A, 0);
        assert_eq!(&frame[1..3], b"\n\r");

        let frames = collect(&mut framer, &envelope(&frame));
        assert_eq!(frames, vec![frame]);
    }

    #[test]
    fn test_tunneled_trailing_crlf() {
        let mut framer = Framer::new(FramerConfig::robot(Convention::Tunneled));
        let frame = motor_frame(7, 8);

        let mut payload = frame.clone();
        payload.extend_from_slice(b"\r\n");

        let frames = collect(&mut framer, &envelope(&payload));
        assert_eq!(frames, vec![frame]);
    }

    #[test]
    fn test_tunneled_noise_between_envelopes() {
        let mut framer = Framer::new(FramerConfig::robot(Convention::Tunneled));
        let frame = motor_frame(5, 5);

        let mut data = b"\r\nSEND OK\r\n".to_vec();
        data.extend_from_slice(&envelope(&frame));

        let frames = collect(&mut framer, &data);
        assert_eq!(frames, vec![frame]);
    }

    #[test]
    fn test_tunneled_bad_prefix_resets() {
        let mut framer = Framer::new(FramerConfig::robot(Convention::Tunneled));

        let frames = collect(&mut framer, b"\r\n+IPX,5:");
        assert!(frames.is_empty());
        assert_eq!(framer.stats().envelope_errors, 1);
        assert_eq!(framer.buffered(), 0);

        let frame = motor_frame(9, 9);
        let frames = collect(&mut framer, &envelope(&frame));
        assert_eq!(frames, vec![frame]);
    }

    #[test]
    fn test_tunneled_missing_colon_resets() {
        let mut framer = Framer::new(FramerConfig::robot(Convention::Tunneled));

        let frames = collect(&mut framer, b"\r\n+IPD,8x");
        assert!(frames.is_empty());
        assert_eq!(framer.stats().envelope_errors, 1);
        assert_eq!(framer.buffered(), 0);
    }

    #[test]
    fn test_tunneled_missing_length_resets() {
        let mut framer = Framer::new(FramerConfig::robot(Convention::Tunneled));

        collect(&mut framer, b"\r\n+IPD,:");
        assert_eq!(framer.stats().envelope_errors, 1);
    }

    #[test]
    fn test_tunneled_zero_length_resets() {
        let mut framer = Framer::new(FramerConfig::robot(Convention::Tunneled));

        collect(&mut framer, b"\r\n+IPD,0:");
        assert_eq!(framer.stats().envelope_errors, 1);
        assert_eq!(framer.buffered(), 0);
    }

    #[test]
    fn test_tunneled_length_beyond_capacity_resets() {
        let mut framer = Framer::new(FramerConfig::robot(Convention::Tunneled));

        collect(&mut framer, b"\r\n+IPD,100:");
        assert_eq!(framer.stats().envelope_errors, 1);
        assert_eq!(framer.buffered(), 0);
    }

    #[test]
    fn test_tunneled_mismatch_on_cr_restarts_envelope() {
        let mut framer = Framer::new(FramerConfig::robot(Convention::Tunneled));
        let frame = motor_frame(11, 12);

        // Truncated prefix immediately followed by a full envelope
        let mut data = b"\r\n+I".to_vec();
        data.extend_from_slice(&envelope(&frame));

        let frames = collect(&mut framer, &data);
        assert_eq!(frames, vec![frame]);
        assert_eq!(framer.stats().envelope_errors, 1);
    }

    #[test]
    fn test_tunneled_region_without_frame() {
        let mut framer = Framer::new(FramerConfig::robot(Convention::Tunneled));

        let frames = collect(&mut framer, &envelope(b"hello"));
        assert!(frames.is_empty());
        assert_eq!(framer.stats().empty_regions, 1);
        assert_eq!(framer.buffered(), 0);
    }

    #[test]
    fn test_extract_maximal_spans() {
        let tags = [PacketType::MotorCommand.tag()];
        let first = motor_frame(1, 1);
        let second = motor_frame(2, 2);

        let mut region = first.clone();
        region.extend_from_slice(&second);

        let mut frames = Vec::new();
        let found = extract_frames(&region, &tags, &mut |frame: &[u8]| {
            frames.push(frame.to_vec());
            true
        });

        assert_eq!(found, 2);
        assert_eq!(frames, vec![first, second]);
    }

    #[test]
    fn test_extract_drops_unterminated_tail() {
        let tags = [PacketType::MotorCommand.tag()];
        let frame = motor_frame(1, 1);

        let mut region = frame.clone();
        region.extend_from_slice(&[PacketType::MotorCommand.tag(), 0x01, 0x02]);

        let mut frames = Vec::new();
        let found = extract_frames(&region, &tags, &mut |span: &[u8]| {
            frames.push(span.to_vec());
            true
        });

        // The terminator is followed by a tag, the tail has none of its own
        assert_eq!(found, 1);
        assert_eq!(frames, vec![frame]);
    }

    #[test]
    fn test_extract_rescans_after_rejected_span() {
        let tags = [PacketType::ErrorReport.tag()];
        let frame = error_frame(ErrorCode::SensorRead);

        let mut region = vec![PacketType::ErrorReport.tag(), 0x13];
        region.extend_from_slice(&frame);

        let mut offered = Vec::new();
        let found = extract_frames(&region, &tags, &mut |span: &[u8]| {
            offered.push(span.to_vec());
            decode_frame(span).is_ok()
        });

        assert_eq!(found, 2);
        assert_eq!(offered, vec![region.clone(), frame]);
    }

    #[test]
    fn test_ingest_checked_recovers_frame_after_stray_tag() {
        let mut framer = Framer::new(FramerConfig::host(Convention::Direct));
        let frame = error_frame(ErrorCode::SensorRead);

        let mut data = vec![0xEE, 0x13];
        data.extend_from_slice(&frame);

        let mut accepted = Vec::new();
        framer.ingest_checked(&data, |span| match decode_frame(span) {
            Ok(packet) => {
                accepted.push(packet);
                true
            }
            Err(_) => false,
        });

        assert_eq!(accepted.len(), 1);
        assert_eq!(
            Message::from_packet(&accepted[0]).unwrap(),
            Message::Error(ErrorCode::SensorRead)
        );
        assert_eq!(framer.buffered(), 0);
    }

    #[test]
    fn test_ingest_takes_first_span_as_is() {
        let mut framer = Framer::new(FramerConfig::host(Convention::Direct));
        let frame = error_frame(ErrorCode::SensorRead);

        let mut data = vec![0xEE, 0x13];
        data.extend_from_slice(&frame);

        assert_eq!(collect(&mut framer, &data), vec![data.clone()]);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut framer = Framer::new(FramerConfig::robot(Convention::Tunneled));
        collect(&mut framer, b"\r\n+IPD,8:");
        assert!(framer.buffered() > 0);

        framer.reset();
        assert_eq!(framer.buffered(), 0);

        let frame = motor_frame(0, 0);
        assert_eq!(collect(&mut framer, &envelope(&frame)), vec![frame]);
    }
}
