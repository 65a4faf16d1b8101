// Copyright (C) 2026 The vtrs Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! RTSP/SDP discovery (`spec.md` §4.3, C3).
//!
//! Grounded on `examples/original_source/VideoTester/sniffer.py`'s
//! `Sniffer.__getDport` and `Sniffer.__getRTT`. All other `SessionCaps`
//! fields are supplied by the media-pipeline collaborator (`spec.md` §6);
//! this module is the sole source of truth for `rtsp_dport` and the RTT
//! samples.

use std::path::Path;

use log::{debug, warn};

use crate::capture::PcapIterator;
use crate::error::{Recoverable, Result};
use crate::model::RttSample;

/// Minimum number of RTT pairs before [`Recoverable::RttUnderSampled`] is
/// logged instead of silently returning fewer samples.
const EXPECTED_RTT_PAIRS: usize = 3;

/// Result of the two-pass discovery: the client-side RTSP TCP port (found
/// via the SDP answer's destination port) and whatever RTT samples were
/// observed.
#[derive(Debug, Clone)]
pub struct Discovery {
    pub rtsp_dport: u16,
    pub rtt: Vec<RttSample>,
}

/// Scans `cap_path` for the SDP answer (identified by `sdp_session_id`) and
/// for up to [`EXPECTED_RTT_PAIRS`] RTSP request/response pairs on the
/// control channel between `rtsp_sport` and the discovered client port.
pub fn discover(
    cap_path: impl AsRef<Path>,
    server_ip: &str,
    sdp_session_id: &[u8],
    rtsp_sport: u16,
) -> Result<Discovery> {
    let rtsp_dport = find_dport(cap_path.as_ref(), server_ip, sdp_session_id)?
        .ok_or_else(|| crate::error::Error::Pipeline(
            "SDP session id not found in capture".into(),
        ))?;
    debug!("discovered rtsp_dport={rtsp_dport}");

    let rtt = find_rtt(cap_path.as_ref(), server_ip, rtsp_sport, rtsp_dport)?;
    if rtt.len() < EXPECTED_RTT_PAIRS {
        warn!(
            "{}",
            Recoverable::RttUnderSampled {
                observed: rtt.len()
            }
        );
    }

    Ok(Discovery { rtsp_dport, rtt })
}

fn find_dport(cap_path: &Path, server_ip: &str, needle: &[u8]) -> Result<Option<u16>> {
    if needle.is_empty() {
        return Ok(None);
    }
    let filter = format!("host {server_ip}");
    let mut iter = PcapIterator::open(cap_path, &filter)?;
    while let Some(pkt) = iter.next() {
        let pkt = pkt?;
        if pkt.data.windows(needle.len()).any(|w| w == needle) {
            let offsets = iter.offsets(&pkt.data)?;
            let base = offsets.datalink + offsets.network;
            if let Some(b) = pkt.data.get(base + 2..base + 4) {
                return Ok(Some(u16::from_be_bytes([b[0], b[1]])));
            }
        }
    }
    Ok(None)
}

fn find_rtt(
    cap_path: &Path,
    server_ip: &str,
    rtsp_sport: u16,
    rtsp_dport: u16,
) -> Result<Vec<RttSample>> {
    let filter = format!(
        "host {server_ip} and ((src port {rtsp_dport} and dst port {rtsp_sport} and tcp[13] = 24) \
         or (src port {rtsp_sport} and dst port {rtsp_dport} and tcp[13] = 16))"
    );
    let mut iter = PcapIterator::open(cap_path, &filter)?;
    let mut rtt = Vec::with_capacity(EXPECTED_RTT_PAIRS);
    for _ in 0..EXPECTED_RTT_PAIRS {
        let req = match iter.next() {
            Some(p) => p?,
            None => break,
        };
        let resp = match iter.next() {
            Some(p) => p?,
            None => break,
        };
        rtt.push(RttSample {
            request_ts: req.timestamp,
            response_ts: resp.timestamp,
        });
    }
    Ok(rtt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn under_sampled_rtt_is_recoverable_not_fatal() {
        let r = Recoverable::RttUnderSampled { observed: 1 };
        assert_eq!(format!("{r}"), "RTT under-sampled: only 1/3 pairs observed");
    }
}
