//! Observability hooks for the TTC pipeline.
//!
//! The pipeline calls a [`TtcReporter`] at each stage instead of printing.
//! All callbacks default to doing nothing, so implementors override only
//! what they need.
//!
//! - [`NoOpReporter`] - discards everything
//! - [`LogReporter`] - emits `tracing` events
//! - [`CollectingReporter`] - keeps every event for later inspection

use crate::association::AssociationStats;
use crate::clustering::ClusterStats;
use crate::matching::BoxCorrespondence;
use crate::ttc::{CameraTtc, LidarTtc};

/// Callbacks invoked while a frame pair is processed.
pub trait TtcReporter {
    /// Range points of a frame were associated with its boxes.
    fn on_association(&mut self, _frame_index: usize, _stats: &AssociationStats) {}

    /// Boxes of the previous frame were linked to the current frame.
    fn on_correspondence(&mut self, _frame_index: usize, _correspondence: &BoxCorrespondence) {}

    /// Keypoint matches were clustered into a current-frame box.
    fn on_cluster(&mut self, _frame_index: usize, _box_id: usize, _stats: &ClusterStats) {}

    /// A camera TTC was computed for a current-frame box.
    fn on_camera_ttc(&mut self, _frame_index: usize, _box_id: usize, _result: &CameraTtc) {}

    /// A LiDAR TTC was computed for a current-frame box.
    fn on_lidar_ttc(&mut self, _frame_index: usize, _box_id: usize, _result: &LidarTtc) {}
}

impl<R: TtcReporter + ?Sized> TtcReporter for Box<R> {
    fn on_association(&mut self, frame_index: usize, stats: &AssociationStats) {
        (**self).on_association(frame_index, stats)
    }

    fn on_correspondence(&mut self, frame_index: usize, correspondence: &BoxCorrespondence) {
        (**self).on_correspondence(frame_index, correspondence)
    }

    fn on_cluster(&mut self, frame_index: usize, box_id: usize, stats: &ClusterStats) {
        (**self).on_cluster(frame_index, box_id, stats)
    }

    fn on_camera_ttc(&mut self, frame_index: usize, box_id: usize, result: &CameraTtc) {
        (**self).on_camera_ttc(frame_index, box_id, result)
    }

    fn on_lidar_ttc(&mut self, frame_index: usize, box_id: usize, result: &LidarTtc) {
        (**self).on_lidar_ttc(frame_index, box_id, result)
    }
}

/// Reporter that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpReporter;

impl TtcReporter for NoOpReporter {}

/// Reporter that forwards events to `tracing`.
///
/// With `verbose` set, TTC values are logged at `info` level, otherwise at `debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter {
    pub verbose: bool,
}

impl LogReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl TtcReporter for LogReporter {
    fn on_association(&mut self, frame_index: usize, stats: &AssociationStats) {
        tracing::debug!(
            frame = frame_index,
            assigned = stats.assigned,
            unmatched = stats.unmatched,
            ambiguous = stats.ambiguous,
            "associated range points"
        );
    }

    fn on_correspondence(&mut self, frame_index: usize, correspondence: &BoxCorrespondence) {
        for pair in correspondence.pairs() {
            tracing::debug!(
                frame = frame_index,
                prev_box = pair.prev_box_id,
                curr_box = pair.curr_box_id,
                votes = pair.votes,
                "matched bounding boxes"
            );
        }
    }

    fn on_cluster(&mut self, frame_index: usize, box_id: usize, stats: &ClusterStats) {
        if stats.enclosed == 0 {
            tracing::warn!(frame = frame_index, box_id, "no keypoint matches inside box");
        } else {
            tracing::debug!(
                frame = frame_index,
                box_id,
                kept = stats.kept(),
                rejected = stats.rejected,
                "clustered keypoint matches"
            );
        }
    }

    fn on_camera_ttc(&mut self, frame_index: usize, box_id: usize, result: &CameraTtc) {
        if self.verbose {
            tracing::info!(frame = frame_index, box_id, ttc = result.ttc, ratios = result.num_ratios, "camera ttc");
        } else {
            tracing::debug!(frame = frame_index, box_id, ttc = result.ttc, ratios = result.num_ratios, "camera ttc");
        }
    }

    fn on_lidar_ttc(&mut self, frame_index: usize, box_id: usize, result: &LidarTtc) {
        if self.verbose {
            tracing::info!(frame = frame_index, box_id, ttc = result.ttc, "lidar ttc");
        } else {
            tracing::debug!(frame = frame_index, box_id, ttc = result.ttc, "lidar ttc");
        }
    }
}

/// A single captured reporter event.
#[derive(Debug, Clone, PartialEq)]
pub enum TtcEvent {
    Association { frame_index: usize, stats: AssociationStats },
    Correspondence { frame_index: usize, pairs: usize },
    Cluster { frame_index: usize, box_id: usize, stats: ClusterStats },
    CameraTtc { frame_index: usize, box_id: usize, result: CameraTtc },
    LidarTtc { frame_index: usize, box_id: usize, result: LidarTtc },
}

/// Reporter that records every event.
#[derive(Debug, Clone, Default)]
pub struct CollectingReporter {
    events: Vec<TtcEvent>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[TtcEvent] {
        &self.events
    }

    /// Recorded camera TTC values in call order.
    pub fn camera_ttcs(&self) -> Vec<f64> {
        self.events
            .iter()
            .filter_map(|e| match e {
                TtcEvent::CameraTtc { result, .. } => Some(result.ttc),
                _ => None,
            })
            .collect()
    }

    /// Recorded LiDAR TTC values in call order.
    pub fn lidar_ttcs(&self) -> Vec<f64> {
        self.events
            .iter()
            .filter_map(|e| match e {
                TtcEvent::LidarTtc { result, .. } => Some(result.ttc),
                _ => None,
            })
            .collect()
    }
}

impl TtcReporter for CollectingReporter {
    fn on_association(&mut self, frame_index: usize, stats: &AssociationStats) {
        self.events.push(TtcEvent::Association { frame_index, stats: *stats });
    }

    fn on_correspondence(&mut self, frame_index: usize, correspondence: &BoxCorrespondence) {
        self.events.push(TtcEvent::Correspondence {
            frame_index,
            pairs: correspondence.len(),
        });
    }

    fn on_cluster(&mut self, frame_index: usize, box_id: usize, stats: &ClusterStats) {
        self.events.push(TtcEvent::Cluster { frame_index, box_id, stats: *stats });
    }

    fn on_camera_ttc(&mut self, frame_index: usize, box_id: usize, result: &CameraTtc) {
        self.events.push(TtcEvent::CameraTtc { frame_index, box_id, result: *result });
    }

    fn on_lidar_ttc(&mut self, frame_index: usize, box_id: usize, result: &LidarTtc) {
        self.events.push(TtcEvent::LidarTtc { frame_index, box_id, result: *result });
    }
}
