// Copyright (C) 2026 The vtrs Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! QoS metric engine (`spec.md` §4.8, C8).
//!
//! Grounded on `examples/original_source/VideoTester/measures/qos.py`'s
//! `Latency`/`Delta`/`Jitter`/`Skew`/`Bandwidth`/`PacketLossRate`/
//! `PacketLossDist`.

use crate::model::{MeasureResult, PacketRecord, RttSample};

/// Mean one-way latency in ms over the observed RTT samples, or `None` if
/// none were captured — the caller should omit the metric rather than
/// report a meaningless value (`spec.md` §7).
pub fn latency(rtt: &[RttSample]) -> Option<MeasureResult> {
    if rtt.is_empty() {
        return None;
    }
    let mean = rtt
        .iter()
        .map(|s| (s.response_ts - s.request_ts) * 500.0)
        .sum::<f64>()
        / rtt.len() as f64;
    Some(MeasureResult::scalar("Latency", "ms", mean))
}

/// Inter-arrival delta in ms, `0` for the first packet.
pub fn delta(records: &[PacketRecord]) -> MeasureResult {
    let x: Vec<f64> = (0..records.len()).map(|i| i as f64).collect();
    let mut y = vec![0.0; records.len()];
    for i in 1..records.len() {
        y[i] = (records[i].arrival_time - records[i - 1].arrival_time) * 1000.0;
    }
    MeasureResult::plot("Delta", ("RTP packet", "ms"), x, y)
}

/// RFC 3550 §A.8 running jitter estimate, in ms. `rtp_ts_secs` must already
/// be normalized to seconds-since-first (see [`crate::rtp::normalize`]).
pub fn jitter(records: &[PacketRecord], rtp_ts_secs: &[f64]) -> MeasureResult {
    let n = records.len();
    let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let mut y = vec![0.0; n];
    for i in 1..n {
        let d = ((records[i].arrival_time - rtp_ts_secs[i])
            - (records[i - 1].arrival_time - rtp_ts_secs[i - 1]))
            * 1000.0;
        y[i] = y[i - 1] + (d.abs() - y[i - 1]) / 16.0;
    }
    MeasureResult::plot("Jitter", ("RTP packet", "ms"), x, y)
}

/// Clock skew between the RTP timestamp clock and the capture clock, in ms.
pub fn skew(records: &[PacketRecord], rtp_ts_secs: &[f64]) -> MeasureResult {
    let x: Vec<f64> = (0..records.len()).map(|i| i as f64).collect();
    let y: Vec<f64> = records
        .iter()
        .zip(rtp_ts_secs)
        .map(|(r, ts)| (ts - r.arrival_time) * 1000.0)
        .collect();
    MeasureResult::plot("Skew", ("RTP packet", "ms"), x, y)
}

/// Instantaneous bandwidth in kbps over a trailing 1-second window, sampled
/// once per distinct arrival time.
pub fn bandwidth(records: &[PacketRecord]) -> MeasureResult {
    let mut sorted: Vec<&PacketRecord> = records.iter().collect();
    sorted.sort_by(|a, b| a.arrival_time.partial_cmp(&b.arrival_time).unwrap());

    let mut collapsed: Vec<&PacketRecord> = Vec::with_capacity(sorted.len());
    for r in sorted {
        if collapsed.last().is_some_and(|last: &&PacketRecord| last.arrival_time == r.arrival_time) {
            continue;
        }
        collapsed.push(r);
    }

    let x: Vec<f64> = collapsed.iter().map(|r| r.arrival_time).collect();
    let mut y = vec![0.0; collapsed.len()];
    for i in 0..collapsed.len() {
        let window_start = collapsed[i].arrival_time - 1.0;
        let sum: f64 = collapsed[..=i]
            .iter()
            .filter(|r| r.arrival_time > window_start)
            .map(|r| r.length as f64 * 8.0 / 1000.0)
            .sum();
        y[i] = sum;
    }
    MeasureResult::plot("Bandwidth", ("time", "kbps"), x, y)
}

/// `Σ (seq[i] - seq[i-1] - 1) / (seq[last] + 1)`.
pub fn packet_loss_rate(records: &[PacketRecord]) -> MeasureResult {
    let mut losses: u64 = 0;
    for i in 1..records.len() {
        losses += records[i].seq.saturating_sub(records[i - 1].seq).saturating_sub(1);
    }
    let denom = records.last().map(|r| r.seq + 1).unwrap_or(1).max(1);
    MeasureResult::scalar("PacketLossRate", "ratio", losses as f64 / denom as f64)
}

/// Per-1-second-bucket loss rate (losses observed in the bucket divided by
/// packets observed in the bucket).
pub fn packet_loss_distribution(records: &[PacketRecord]) -> MeasureResult {
    if records.is_empty() {
        return MeasureResult::bar("PacketLossDistribution", ("time", "ratio"), vec![], vec![], 1.0);
    }
    let num_buckets = records.last().unwrap().arrival_time.floor() as usize + 1;
    let mut packets = vec![0u64; num_buckets];
    let mut losses = vec![0u64; num_buckets];
    for i in 0..records.len() {
        let bucket = records[i].arrival_time.floor() as usize;
        packets[bucket] += 1;
        if i > 0 {
            losses[bucket] += records[i].seq.saturating_sub(records[i - 1].seq).saturating_sub(1);
        }
    }
    let x: Vec<f64> = (0..num_buckets).map(|i| i as f64).collect();
    let y: Vec<f64> = (0..num_buckets)
        .map(|i| if packets[i] == 0 { 0.0 } else { losses[i] as f64 / packets[i] as f64 })
        .collect();
    MeasureResult::bar("PacketLossDistribution", ("time", "ratio"), x, y, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MeasurePayload;

    fn rec(seq: u64, arrival_time: f64, length: u32) -> PacketRecord {
        PacketRecord { length, arrival_time, seq, rtp_ts: 0 }
    }

    #[test]
    fn no_rtt_samples_omits_latency() {
        assert!(latency(&[]).is_none());
    }

    #[test]
    fn packet_loss_rate_counts_sequence_gaps() {
        let records = vec![rec(0, 0.0, 100), rec(2, 0.01, 100), rec(3, 0.02, 100)];
        let result = packet_loss_rate(&records);
        match result.payload {
            MeasurePayload::Scalar { value } => assert!((value - 0.25).abs() < 1e-9),
            _ => panic!("expected scalar"),
        }
    }

    #[test]
    fn bandwidth_sums_trailing_window() {
        let records = vec![rec(0, 0.0, 1000), rec(1, 0.5, 1000), rec(2, 1.5, 1000)];
        let result = bandwidth(&records);
        match result.payload {
            MeasurePayload::Plot { y, .. } => {
                assert_eq!(y.len(), 3);
                assert!((y[1] - 16.0).abs() < 1e-9); // both packets within 1s of t=0.5
                assert!((y[2] - 8.0).abs() < 1e-9); // only the t=1.5 packet itself
            }
            _ => panic!("expected plot"),
        }
    }
}
