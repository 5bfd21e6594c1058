/// MPEG-2 transport stream structural validation
///
/// Every (position, length) segment supplied as evidence must hold whole
/// 188-byte transport packets whose video PES structure is intact: each
/// packet starts with the sync byte, PES starts on the video PID carry the
/// `00 00 01` start code, and the segment contains exactly one PES start.
use crate::config::types::Evidence;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const TS_PACKET_SIZE: usize = 188;
pub const SYNC_BYTE: u8 = 0x47;
/// PID carrying the video elementary stream
pub const VIDEO_PID: u16 = 256;
/// Segments whose last packet is on this PID are accepted whatever their
/// PES start count.
// Intent unconfirmed (PID 257 is usually the first audio stream); keep
// the exception to this PID only.
pub const TOLERATED_PID: u16 = 257;

const PES_START_CODE: [u8; 3] = [0x00, 0x00, 0x01];

/// Why a rendition failed structural validation
#[derive(Error, Debug)]
pub enum PacketFault {
    #[error("cannot open {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("segment {segment}: seek to {position} failed: {source}")]
    Seek {
        segment: usize,
        position: u64,
        source: io::Error,
    },

    #[error("segment {segment} packet {packet}: read failed: {source}")]
    Read {
        segment: usize,
        packet: u64,
        source: io::Error,
    },

    #[error("segment {segment} packet {packet}: bad sync byte 0x{found:02x}")]
    SyncByte { segment: usize, packet: u64, found: u8 },

    #[error("segment {segment} packet {packet}: adaptation field overruns packet")]
    AdaptationOverflow { segment: usize, packet: u64 },

    #[error("segment {segment} packet {packet}: PES start without start code")]
    StartCode { segment: usize, packet: u64 },

    #[error("segment {segment}: {starts} PES start(s), expected 1 (last pid {last_pid:?})")]
    StartCount {
        segment: usize,
        starts: usize,
        last_pid: Option<u16>,
    },

    #[error("{positions} positions but {lengths} lengths")]
    SegmentMismatch { positions: usize, lengths: usize },
}

/// What a successful validation looked at
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationSummary {
    pub segments_checked: usize,
    pub segments_skipped: usize,
    pub segments_tolerated: usize,
    pub packets_scanned: u64,
}

/// Structural validator seam used by the orchestrator
pub trait StreamValidator {
    fn validate(&self, evidence: &Evidence) -> Result<ValidationSummary, PacketFault>;
}

impl<T: StreamValidator + ?Sized> StreamValidator for &T {
    fn validate(&self, evidence: &Evidence) -> Result<ValidationSummary, PacketFault> {
        (**self).validate(evidence)
    }
}

/// Validates rendition files on disk
#[derive(Debug, Clone, Copy, Default)]
pub struct TsPacketValidator;

impl StreamValidator for TsPacketValidator {
    fn validate(&self, evidence: &Evidence) -> Result<ValidationSummary, PacketFault> {
        validate_file(
            Path::new(&evidence.rendition_path),
            &evidence.positions,
            &evidence.lengths,
        )
    }
}

/// Validate the segments of the transport stream file at `path`
pub fn validate_file(
    path: &Path,
    positions: &[u64],
    lengths: &[u64],
) -> Result<ValidationSummary, PacketFault> {
    let file = File::open(path).map_err(|source| PacketFault::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = BufReader::new(file);
    validate_stream(&mut reader, positions, lengths)
}

/// Validate the segments of any seekable transport stream
pub fn validate_stream<R: Read + Seek>(
    reader: &mut R,
    positions: &[u64],
    lengths: &[u64],
) -> Result<ValidationSummary, PacketFault> {
    if positions.len() != lengths.len() {
        return Err(PacketFault::SegmentMismatch {
            positions: positions.len(),
            lengths: lengths.len(),
        });
    }

    let mut summary = ValidationSummary::default();
    let mut packet = [0u8; TS_PACKET_SIZE];

    for (segment, (&position, &length)) in positions.iter().zip(lengths).enumerate() {
        if position == 0 && length == 0 {
            summary.segments_skipped += 1;
            continue;
        }

        reader
            .seek(SeekFrom::Start(position))
            .map_err(|source| PacketFault::Seek {
                segment,
                position,
                source,
            })?;

        let packet_count = length / TS_PACKET_SIZE as u64;
        let mut starts = 0usize;
        let mut last_pid = None;

        for index in 0..packet_count {
            reader
                .read_exact(&mut packet)
                .map_err(|source| PacketFault::Read {
                    segment,
                    packet: index,
                    source,
                })?;
            summary.packets_scanned += 1;

            if packet[0] != SYNC_BYTE {
                return Err(PacketFault::SyncByte {
                    segment,
                    packet: index,
                    found: packet[0],
                });
            }

            let pid = packet_pid(&packet);
            last_pid = Some(pid);
            if pid != VIDEO_PID {
                continue;
            }

            let payload = packet_payload(&packet).ok_or(PacketFault::AdaptationOverflow {
                segment,
                packet: index,
            })?;

            if payload_unit_start(&packet) && !payload.is_empty() {
                if payload.len() < 4 || payload[..3] != PES_START_CODE {
                    return Err(PacketFault::StartCode {
                        segment,
                        packet: index,
                    });
                }
                if is_pes_stream_start(payload[3]) {
                    starts += 1;
                }
            }
        }

        if starts != 1 {
            if last_pid == Some(TOLERATED_PID) {
                log::debug!(
                    "segment {}: {} PES starts tolerated (last pid {})",
                    segment,
                    starts,
                    TOLERATED_PID
                );
                summary.segments_tolerated += 1;
                continue;
            }
            return Err(PacketFault::StartCount {
                segment,
                starts,
                last_pid,
            });
        }

        summary.segments_checked += 1;
    }

    Ok(summary)
}

/// 13-bit packet identifier
fn packet_pid(packet: &[u8; TS_PACKET_SIZE]) -> u16 {
    (u16::from(packet[1] & 0x1F) << 8) | u16::from(packet[2])
}

fn payload_unit_start(packet: &[u8; TS_PACKET_SIZE]) -> bool {
    packet[1] & 0x40 != 0
}

/// Payload bytes after the header and any adaptation field.
/// `None` when the adaptation field length runs past the packet end.
fn packet_payload(packet: &[u8; TS_PACKET_SIZE]) -> Option<&[u8]> {
    let control = (packet[3] >> 4) & 0x03;
    let has_adaptation = control & 0x02 != 0;
    let has_payload = control & 0x01 != 0;

    let start = if has_adaptation {
        5 + usize::from(packet[4])
    } else {
        4
    };
    if start > TS_PACKET_SIZE {
        return None;
    }
    if !has_payload {
        return Some(&[]);
    }
    Some(&packet[start..])
}

/// Video (0xE0-0xEF) or audio (0xC0-0xDF) PES stream id
fn is_pes_stream_start(stream_id: u8) -> bool {
    matches!(stream_id, 0xE0..=0xEF | 0xC0..=0xDF)
}
