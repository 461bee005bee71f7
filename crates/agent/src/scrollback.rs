// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Chunked scrollback ring for raw PTY output.
//!
//! Output is kept as an ordered sequence of chunks tagged with the global
//! byte offset at which they start, capped at a character budget. When the
//! budget is exceeded the oldest chunks are dropped whole. Consumers can
//! replay from a global offset (as far back as retention allows) or take a
//! cheap tail view. The tail is the only input detectors ever see.

use std::collections::VecDeque;
use std::time::SystemTime;

use bytes::Bytes;

/// Default retention budget in bytes.
pub const DEFAULT_CAPACITY: usize = 200_000;

/// Default tail window handed to detectors.
pub const DEFAULT_TAIL: usize = 500;

/// One contiguous run of output as read from the PTY.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Global byte offset of the first byte of this chunk.
    pub offset: u64,
    /// Wall-clock time the chunk was read.
    pub at: SystemTime,
    pub data: Bytes,
}

/// Bounded scrollback of output chunks.
#[derive(Debug)]
pub struct Scrollback {
    chunks: VecDeque<Chunk>,
    capacity: usize,
    retained: usize,
    total_written: u64,
}

impl Scrollback {
    pub fn new(capacity: usize) -> Self {
        Self {
            chunks: VecDeque::new(),
            capacity: capacity.max(1),
            retained: 0,
            total_written: 0,
        }
    }

    /// Append a chunk, evicting the oldest chunks once over budget.
    pub fn push(&mut self, data: Bytes) {
        if data.is_empty() {
            return;
        }
        let chunk = Chunk { offset: self.total_written, at: SystemTime::now(), data };
        self.total_written += chunk.data.len() as u64;
        self.retained += chunk.data.len();
        self.chunks.push_back(chunk);

        while self.retained > self.capacity && self.chunks.len() > 1 {
            if let Some(old) = self.chunks.pop_front() {
                self.retained -= old.data.len();
            }
        }
        // A single chunk larger than the whole budget is kept truncated
        // from the front so the tail stays available.
        if self.retained > self.capacity {
            if let Some(only) = self.chunks.front_mut() {
                let excess = self.retained - self.capacity;
                only.data = only.data.slice(excess..);
                only.offset += excess as u64;
                self.retained = self.capacity;
            }
        }
    }

    /// Total bytes ever written through this scrollback.
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Global offset of the oldest retained byte.
    pub fn oldest_offset(&self) -> u64 {
        self.chunks.front().map(|c| c.offset).unwrap_or(self.total_written)
    }

    /// Copy of the last `n` bytes. This is the detector input window.
    pub fn tail(&self, n: usize) -> Vec<u8> {
        let want = n.min(self.retained);
        let mut out = Vec::with_capacity(want);
        let mut remaining = want;
        // Walk backwards collecting chunks until the window is covered.
        let mut parts: Vec<&[u8]> = Vec::new();
        for chunk in self.chunks.iter().rev() {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(chunk.data.len());
            parts.push(&chunk.data[chunk.data.len() - take..]);
            remaining -= take;
        }
        for part in parts.into_iter().rev() {
            out.extend_from_slice(part);
        }
        out
    }

    /// All retained bytes, concatenated.
    pub fn buffered(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.retained);
        for chunk in &self.chunks {
            out.extend_from_slice(&chunk.data);
        }
        out
    }

    /// Read bytes starting at a global offset.
    ///
    /// Returns `None` when the offset has aged out of retention or lies
    /// beyond the write position.
    pub fn read_from(&self, offset: u64) -> Option<Vec<u8>> {
        if offset > self.total_written || offset < self.oldest_offset() {
            return None;
        }
        let mut out = Vec::new();
        for chunk in &self.chunks {
            let end = chunk.offset + chunk.data.len() as u64;
            if end <= offset {
                continue;
            }
            let start = offset.saturating_sub(chunk.offset) as usize;
            out.extend_from_slice(&chunk.data[start.min(chunk.data.len())..]);
        }
        Some(out)
    }

    /// Chunks retained, oldest first.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter()
    }
}

impl Default for Scrollback {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
#[path = "scrollback_tests.rs"]
mod tests;
