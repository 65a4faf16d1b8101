// Copyright (C) 2026 The vtrs Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live packet capture (`spec.md` §4.1, C1).
//!
//! Grounded on `examples/original_source/VideoTester/sniffer.py`'s
//! `Sniffer.run` (`open_live` + `setfilter` + `dump_open` + `dispatch`
//! loop). The blocking libpcap read is moved to a dedicated thread via
//! [`tokio::task::spawn_blocking`] so the async session orchestrator
//! (`spec.md` §5) can run it alongside the media-pipeline task and cancel
//! it with a [`CancellationToken`].

use std::path::Path;

use log::{error, info};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

const SNAPLEN: i32 = 65536;
/// Read timeout so the blocking loop can poll `cancel` periodically instead
/// of blocking forever on an idle interface.
const POLL_TIMEOUT_MS: i32 = 100;

fn open_live(iface: &str) -> std::result::Result<pcap::Capture<pcap::Active>, pcap::Error> {
    pcap::Capture::from_device(iface)?
        .promisc(true)
        .snaplen(SNAPLEN)
        .timeout(POLL_TIMEOUT_MS)
        .open()
}

/// Captures packets matching `host <server_ip> and (tcp or udp)` from
/// `iface` into `out_path` until `cancel` fires.
///
/// On a [`Error::CaptureInit`] failure the capture file is left empty, as
/// `spec.md` §4.1 requires: the caller must treat an empty file as a fatal
/// run error.
pub async fn capture(
    iface: String,
    server_ip: String,
    out_path: impl AsRef<Path>,
    cancel: CancellationToken,
) -> Result<()> {
    let out_path = out_path.as_ref().to_owned();
    tokio::task::spawn_blocking(move || run_blocking(&iface, &server_ip, &out_path, cancel))
        .await
        .expect("capture task panicked")
}

fn run_blocking(
    iface: &str,
    server_ip: &str,
    out_path: &Path,
    cancel: CancellationToken,
) -> Result<()> {
    let mut capture = open_live(iface).map_err(|source| {
        error!("failed to open capture on {iface}: {source}");
        let _ = std::fs::File::create(out_path);
        Error::CaptureInit {
            iface: iface.to_owned(),
            source,
        }
    })?;

    let filter = format!("host {server_ip} and (tcp or udp)");
    capture.filter(&filter, false)?;

    let mut savefile = capture.savefile(out_path)?;
    info!("capturing on {iface} with filter `{filter}` -> {}", out_path.display());

    let mut count: u64 = 0;
    while !cancel.is_cancelled() {
        match capture.next_packet() {
            Ok(pkt) => {
                savefile.write(&pkt);
                count += 1;
            }
            Err(pcap::Error::TimeoutExpired) => continue,
            Err(pcap::Error::NoMorePackets) => break,
            Err(e) => return Err(e.into()),
        }
    }
    info!("capture stopped after {count} packets");
    Ok(())
}
