//! Bounded per-equipment telemetry history.
//!
//! This module provides the in-memory rolling buffer that retains the most
//! recent frames for each piece of equipment.
//!
//! Each equipment id owns its own independently locked ring, created lazily on
//! first ingest. The outer map is only write-locked to insert a new ring, so
//! producers for different equipment never wait on each other once their rings
//! exist. Reads and writes for the same equipment serialize on that ring's
//! mutex, so a reader always sees a complete prior history.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, trace};

use crate::frame::DiagnosticFrame;

/// Default number of frames retained per equipment.
pub const DEFAULT_CAPACITY: usize = 60;

type History = Arc<Mutex<VecDeque<DiagnosticFrame>>>;

/// Rolling, bounded history of frames per equipment.
#[derive(Debug)]
pub struct TelemetryBuffer {
    capacity: usize,
    histories: RwLock<HashMap<String, History>>,
}

/// Point-in-time statistics about a [`TelemetryBuffer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferStats {
    /// Frames retained per equipment.
    pub capacity: usize,
    /// Number of equipment ids with a history.
    pub equipment_count: usize,
    /// Frames currently retained across all equipment.
    pub total_frames: usize,
    /// Timestamp of the newest retained frame.
    pub newest_frame: Option<DateTime<Utc>>,
}

impl Default for TelemetryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl TelemetryBuffer {
    /// Create a buffer retaining `capacity` frames per equipment.
    ///
    /// A capacity of zero is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            histories: RwLock::new(HashMap::new()),
        }
    }

    /// Frames retained per equipment.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a frame to its equipment's history.
    ///
    /// Unknown equipment ids are created on first ingest. When the history is
    /// full the oldest frame is evicted and returned.
    pub fn ingest(&self, frame: DiagnosticFrame) -> Option<DiagnosticFrame> {
        let history = self.history_or_insert(frame.equipment_id());
        let mut frames = history.lock();
        frames.push_back(frame);

        let mut evicted = None;
        while frames.len() > self.capacity {
            evicted = frames.pop_front();
        }
        if let Some(old) = &evicted {
            trace!(equipment = %old.equipment_id(), frame = %old.id(), "evicted oldest frame");
        }
        evicted
    }

    /// The most recently ingested frame, or `None` if there is none yet.
    #[must_use]
    pub fn latest(&self, equipment_id: &str) -> Option<DiagnosticFrame> {
        let history = self.history(equipment_id)?;
        let frames = history.lock();
        frames.back().cloned()
    }

    /// Up to `count` most recent frames, oldest first.
    ///
    /// Unknown equipment and a zero count both yield an empty list.
    #[must_use]
    pub fn recent(&self, equipment_id: &str, count: usize) -> Vec<DiagnosticFrame> {
        if count == 0 {
            return Vec::new();
        }
        let Some(history) = self.history(equipment_id) else {
            return Vec::new();
        };
        let frames = history.lock();
        let skip = frames.len().saturating_sub(count);
        frames.iter().skip(skip).cloned().collect()
    }

    /// Number of frames retained for one equipment.
    #[must_use]
    pub fn len(&self, equipment_id: &str) -> usize {
        self.history(equipment_id).map_or(0, |h| h.lock().len())
    }

    /// Equipment ids with a history, sorted.
    #[must_use]
    pub fn equipment_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.histories.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Gather statistics across all equipment.
    #[must_use]
    pub fn stats(&self) -> BufferStats {
        let histories: Vec<History> = self.histories.read().values().cloned().collect();
        let mut total_frames = 0;
        let mut newest_frame = None;
        for history in &histories {
            let frames = history.lock();
            total_frames += frames.len();
            let newest = frames.back().map(DiagnosticFrame::timestamp);
            newest_frame = newest_frame.max(newest);
        }
        BufferStats {
            capacity: self.capacity,
            equipment_count: histories.len(),
            total_frames,
            newest_frame,
        }
    }

    fn history(&self, equipment_id: &str) -> Option<History> {
        self.histories.read().get(equipment_id).cloned()
    }

    fn history_or_insert(&self, equipment_id: &str) -> History {
        if let Some(history) = self.history(equipment_id) {
            return history;
        }
        let mut histories = self.histories.write();
        histories
            .entry(equipment_id.to_string())
            .or_insert_with(|| {
                debug!(equipment = %equipment_id, capacity = self.capacity, "new equipment history");
                Arc::new(Mutex::new(VecDeque::with_capacity(self.capacity)))
            })
            .clone()
    }
}
