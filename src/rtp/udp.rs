// Copyright (C) 2026 The vtrs Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! RTP-over-UDP dissection (`spec.md` §4.4, C4).
//!
//! Grounded on `examples/original_source/VideoTester/sniffer.py`'s
//! `Sniffer.__parseUDP`, with RTP header parsing taken from the teacher's
//! `client::rtp` module (`rtp_rs::RtpReader`, manual big-endian sequence
//! read since `rtp_rs` doesn't expose a `sequence_number()` accessor).

use std::collections::BTreeMap;
use std::path::Path;

use crate::capture::{HeaderOffsets, PcapIterator};
use crate::error::Result;
use crate::model::PacketRecord;
use crate::rtp::SeqUnwrapper;

/// Dissects one RTP-over-UDP stream destined for `udp_dport`, skipping any
/// packet whose PT (byte 1, mask `0x7F`) doesn't match `payload_type` — e.g.
/// a concurrent audio session sharing the same destination port.
///
/// Returns the normalized packet records plus their RTP timestamps
/// converted to seconds-since-first (see [`crate::rtp::normalize`]).
pub fn parse(
    cap_path: impl AsRef<Path>,
    server_ip: &str,
    udp_dport: u16,
    payload_type: u8,
    seq_base: u32,
    clock_rate: u32,
) -> Result<(Vec<PacketRecord>, Vec<f64>)> {
    let filter = format!("host {server_ip} and udp and dst port {udp_dport}");
    let mut iter = PcapIterator::open(cap_path, &filter)?;

    let mut offsets: Option<HeaderOffsets> = None;
    let mut by_seq: BTreeMap<u64, PacketRecord> = BTreeMap::new();
    let mut unwrap = SeqUnwrapper::new();

    while let Some(pkt) = iter.next() {
        let pkt = pkt?;
        let off = match offsets {
            Some(o) => o,
            None => {
                let o = iter.offsets(&pkt.data)?;
                offsets = Some(o);
                o
            }
        };

        let Some(payload) = pkt.data.get(off.payload_offset()..) else {
            continue;
        };
        let Ok(reader) = rtp_rs::RtpReader::new(payload) else {
            continue;
        };
        if payload.len() < 4 {
            continue;
        }
        let pt = payload[1] & 0x7F;
        if pt != payload_type {
            continue;
        }
        let sequence_number = u16::from_be_bytes([payload[2], payload[3]]);
        let seq = unwrap.extend(sequence_number);

        let record = PacketRecord {
            length: (pkt.data.len() - off.datalink) as u32,
            arrival_time: pkt.timestamp,
            seq,
            rtp_ts: reader.timestamp(),
        };
        by_seq.entry(seq).or_insert(record);
    }

    let mut records: Vec<PacketRecord> = by_seq.into_values().collect();
    let rtp_ts_secs = crate::rtp::normalize(&mut records, seq_base, clock_rate);
    Ok((records, rtp_ts_secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_wrap_is_unwrapped_before_dedup() {
        let mut unwrap = SeqUnwrapper::new();
        let mut by_seq: BTreeMap<u64, u32> = BTreeMap::new();
        for (raw, arrival) in [(65534u16, 0u32), (65535, 1), (0, 2), (1, 3)] {
            let seq = unwrap.extend(raw);
            by_seq.entry(seq).or_insert(arrival);
        }
        let arrivals: Vec<u32> = by_seq.into_values().collect();
        assert_eq!(arrivals, vec![0, 1, 2, 3]);
    }
}
