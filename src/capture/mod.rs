// Copyright (C) 2026 The vtrs Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Packet capture: live acquisition (C1) and saved-file iteration with
//! header-offset computation (C2).

mod live;
mod offsets;

pub mod iter;

pub use iter::{CapturedPacket, PcapIterator};
pub use live::capture;
pub use offsets::{compute_offsets, HeaderOffsets};
