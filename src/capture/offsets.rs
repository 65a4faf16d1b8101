// Copyright (C) 2026 The vtrs Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-packet header offset computation (`spec.md` §4.2, C2).
//!
//! Reused by every dissector so header skipping is O(1) rather than
//! re-parsing; grounded on `examples/original_source/VideoTester/sniffer.py`
//! (`PcapIter.getOffsets`).

use crate::error::{Error, Result};

/// Byte offsets, from the start of the captured frame, of the network and
/// transport layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderOffsets {
    /// Length of the data-link header (e.g. 14 for Ethernet-II).
    pub datalink: usize,
    /// Length of the network-layer header, counted from `datalink`.
    pub network: usize,
    /// Length of the transport-layer header, counted from `datalink + network`.
    pub transport: usize,
}

impl HeaderOffsets {
    /// Offset of the first byte of the transport payload.
    pub fn payload_offset(&self) -> usize {
        self.datalink + self.network + self.transport
    }
}

fn byte_at(pkt: &[u8], offset: usize) -> Result<u8> {
    pkt.get(offset).copied().ok_or(Error::ParseUnderrun {
        offset,
        len: pkt.len(),
    })
}

/// Computes [`HeaderOffsets`] for one captured frame.
pub fn compute_offsets(linktype: pcap::Linktype, pkt: &[u8]) -> Result<HeaderOffsets> {
    let datalink = match linktype {
        pcap::Linktype::ETHERNET => 14,
        pcap::Linktype::LINUX_SLL => 16,
        other => return Err(Error::UnsupportedLink(other)),
    };

    let ip_first_byte = byte_at(pkt, datalink)?;
    let ipv = ip_first_byte >> 4;
    let (network, proto) = match ipv {
        4 => {
            let ihl = ip_first_byte & 0x0F;
            (4 * ihl as usize, byte_at(pkt, datalink + 9)?)
        }
        6 => (40, byte_at(pkt, datalink + 6)?),
        other => return Err(Error::UnsupportedNetwork(other)),
    };

    let transport = match proto {
        6 => {
            let data_offset_byte = byte_at(pkt, datalink + network + 12)?;
            4 * ((data_offset_byte >> 4) as usize)
        }
        17 => 8,
        other => return Err(Error::UnsupportedTransport(other)),
    };

    Ok(HeaderOffsets {
        datalink,
        network,
        transport,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eth_ipv4_udp(ihl_words: u8) -> Vec<u8> {
        let mut pkt = vec![0u8; 14 + 20 + 8 + 12];
        pkt[14] = 0x40 | ihl_words; // version 4, IHL
        pkt[14 + 9] = 17; // UDP
        pkt
    }

    #[test]
    fn ethernet_ipv4_udp_offsets() {
        let pkt = eth_ipv4_udp(5);
        let off = compute_offsets(pcap::Linktype::ETHERNET, &pkt).unwrap();
        assert_eq!(off.datalink, 14);
        assert_eq!(off.network, 20);
        assert_eq!(off.transport, 8);
        assert_eq!(off.payload_offset(), 42);
    }

    #[test]
    fn ethernet_ipv4_tcp_offsets() {
        let mut pkt = vec![0u8; 14 + 20 + 20];
        pkt[14] = 0x45;
        pkt[14 + 9] = 6; // TCP
        pkt[14 + 20 + 12] = 0x50; // data offset = 5 words
        let off = compute_offsets(pcap::Linktype::ETHERNET, &pkt).unwrap();
        assert_eq!(off.network, 20);
        assert_eq!(off.transport, 20);
    }

    #[test]
    fn linux_sll_offset() {
        let mut pkt = vec![0u8; 16 + 20 + 8];
        pkt[16] = 0x45;
        pkt[16 + 9] = 17;
        let off = compute_offsets(pcap::Linktype::LINUX_SLL, &pkt).unwrap();
        assert_eq!(off.datalink, 16);
    }

    #[test]
    fn unsupported_link_fails() {
        let pkt = vec![0u8; 64];
        let err = compute_offsets(pcap::Linktype::RAW, &pkt).unwrap_err();
        assert!(matches!(err, Error::UnsupportedLink(_)));
    }

    #[test]
    fn unsupported_transport_fails() {
        let mut pkt = vec![0u8; 14 + 20];
        pkt[14] = 0x45;
        pkt[14 + 9] = 1; // ICMP
        let err = compute_offsets(pcap::Linktype::ETHERNET, &pkt).unwrap_err();
        assert!(matches!(err, Error::UnsupportedTransport(1)));
    }

    #[test]
    fn underrun_fails_cleanly() {
        let pkt = vec![0u8; 10];
        let err = compute_offsets(pcap::Linktype::ETHERNET, &pkt).unwrap_err();
        assert!(matches!(err, Error::ParseUnderrun { .. }));
    }
}
