//! Cross-frame bounding-box correspondence by keypoint-match voting.

use std::collections::BTreeMap;

use nalgebra::DMatrix;

use crate::frame::{DataFrame, KeypointMatch};
use crate::Result;

/// One previous-frame box linked to its best current-frame box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxPair {
    pub prev_box_id: usize,
    pub curr_box_id: usize,
    /// Number of keypoint matches supporting this link.
    pub votes: u32,
}

/// Mapping from previous-frame box ids to current-frame box ids.
///
/// Every previous box maps to at most one current box. Previous boxes that
/// received no votes at all have no entry.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxCorrespondence {
    pairs: BTreeMap<usize, BoxPair>,
    /// Vote counts indexed by (previous box index, current box index).
    votes: DMatrix<u32>,
}

impl BoxCorrespondence {
    /// Current box id matched to the given previous box id.
    pub fn get(&self, prev_box_id: usize) -> Option<usize> {
        self.pairs.get(&prev_box_id).map(|p| p.curr_box_id)
    }

    pub fn pair(&self, prev_box_id: usize) -> Option<&BoxPair> {
        self.pairs.get(&prev_box_id)
    }

    /// Pairs in ascending previous-box-id order.
    pub fn pairs(&self) -> impl Iterator<Item = &BoxPair> {
        self.pairs.values()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn vote_matrix(&self) -> &DMatrix<u32> {
        &self.votes
    }
}

/// Vote which current-frame box each previous-frame box corresponds to.
///
/// Every match adds one vote to each (previous box, current box) pair whose
/// regions contain its previous and current keypoint respectively. Each
/// previous box takes the current box with the most votes; ties go to the
/// lowest current index.
///
/// # Arguments
/// * `matches` - Keypoint matches from `prev_frame` to `curr_frame`
/// * `prev_frame` - Previous frame (keypoints indexed by `query_idx`)
/// * `curr_frame` - Current frame (keypoints indexed by `train_idx`)
pub fn match_bounding_boxes(
    matches: &[KeypointMatch],
    prev_frame: &DataFrame,
    curr_frame: &DataFrame,
) -> Result<BoxCorrespondence> {
    match_bounding_boxes_with(matches, prev_frame, curr_frame, false)
}

/// Same as [`match_bounding_boxes`], optionally ignoring the last match.
///
/// With `skip_final_match` set, the last entry of `matches` casts no vote.
pub fn match_bounding_boxes_with(
    matches: &[KeypointMatch],
    prev_frame: &DataFrame,
    curr_frame: &DataFrame,
    skip_final_match: bool,
) -> Result<BoxCorrespondence> {
    let prev_boxes = &prev_frame.bounding_boxes;
    let curr_boxes = &curr_frame.bounding_boxes;
    let mut votes = DMatrix::<u32>::zeros(prev_boxes.len(), curr_boxes.len());

    let voting = if skip_final_match {
        &matches[..matches.len().saturating_sub(1)]
    } else {
        matches
    };

    let mut in_prev = Vec::new();
    let mut in_curr = Vec::new();
    for m in voting {
        let (kpt_prev, kpt_curr) = m.resolve(&prev_frame.keypoints, &curr_frame.keypoints)?;

        in_prev.clear();
        in_prev.extend(
            prev_boxes
                .iter()
                .enumerate()
                .filter(|(_, b)| b.roi.contains(&kpt_prev.pt))
                .map(|(i, _)| i),
        );
        in_curr.clear();
        in_curr.extend(
            curr_boxes
                .iter()
                .enumerate()
                .filter(|(_, b)| b.roi.contains(&kpt_curr.pt))
                .map(|(j, _)| j),
        );

        for &i in &in_prev {
            for &j in &in_curr {
                votes[(i, j)] += 1;
            }
        }
    }

    let mut pairs = BTreeMap::new();
    for (i, prev_box) in prev_boxes.iter().enumerate() {
        let mut best: Option<(usize, u32)> = None;
        for j in 0..curr_boxes.len() {
            let count = votes[(i, j)];
            if count > best.map_or(0, |(_, c)| c) {
                best = Some((j, count));
            }
        }

        if let Some((j, count)) = best {
            pairs.insert(
                prev_box.box_id,
                BoxPair {
                    prev_box_id: prev_box.box_id,
                    curr_box_id: curr_boxes[j].box_id,
                    votes: count,
                },
            );
        }
    }

    Ok(BoxCorrespondence { pairs, votes })
}

/// Current-frame box ids that no previous box was matched to.
pub fn get_unmatched_current(correspondence: &BoxCorrespondence, curr_frame: &DataFrame) -> Vec<usize> {
    let mut is_matched = vec![false; curr_frame.bounding_boxes.len()];
    for pair in correspondence.pairs() {
        if let Some(idx) = curr_frame
            .bounding_boxes
            .iter()
            .position(|b| b.box_id == pair.curr_box_id)
        {
            is_matched[idx] = true;
        }
    }
    curr_frame
        .bounding_boxes
        .iter()
        .zip(is_matched)
        .filter(|(_, matched)| !matched)
        .map(|(b, _)| b.box_id)
        .collect()
}
