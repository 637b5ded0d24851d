// Copyright (c) Tablechain, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Deterministic external height derivation.
//!
//! Every validator must pin deposit queries to the same L2 height without
//! talking to the L2, so the height is a pure function of the consensus block
//! timestamp: elapsed L2 blocks since the L2 genesis, minus a finality margin
//! that defends against reorgs. Wall-clock skew between validators is
//! irrelevant because the input is the block time agreed under consensus.

use serde::{Deserialize, Serialize};

/// Blocks subtracted from the derived tip so queries never act on data that
/// could still be reorganized away. 64 blocks matches the donor chain's
/// finalization depth.
pub const DEFAULT_FINALITY_MARGIN: u64 = 64;

/// Maps consensus timestamps to safe L2 query heights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalHeightClock {
    /// Unix timestamp (seconds) of L2 block 0.
    pub genesis_time: u64,
    /// L2 block production interval in seconds.
    pub block_interval_secs: u64,
    /// Reorg defense margin in blocks.
    pub finality_margin: u64,
}

impl ExternalHeightClock {
    pub fn new(genesis_time: u64, block_interval_secs: u64, finality_margin: u64) -> Self {
        Self {
            genesis_time,
            block_interval_secs: block_interval_secs.max(1),
            finality_margin,
        }
    }

    /// Estimated L2 tip at `block_time`, before the finality margin.
    pub fn estimated_height(&self, block_time: u64) -> u64 {
        block_time.saturating_sub(self.genesis_time) / self.block_interval_secs
    }

    /// Safe query height for a block with consensus timestamp `block_time`:
    /// `max(1, estimated_height - finality_margin)`.
    ///
    /// Never returns 0 — height 0 is the "unset" sentinel in contract query
    /// paths, and the genesis block itself holds no deposits.
    pub fn safe_height(&self, block_time: u64) -> u64 {
        self.estimated_height(block_time)
            .saturating_sub(self.finality_margin)
            .max(1)
    }
}
