use std::cmp::Ordering;

use crate::detect::result::Detection;

/// Greedy per-class non-max suppression.
///
/// Sorts by score (highest first) and drops any box whose IoU with an already kept
/// box of the same class exceeds `iou_threshold`.
pub fn non_max_suppression(detections: &mut Vec<Detection>, iou_threshold: f32) {
    detections.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    let mut kept = 0;
    for index in 0..detections.len() {
        let candidate = detections[index];
        let suppressed = detections[..kept].iter().any(|prev| {
            prev.class_id == candidate.class_id && prev.iou(&candidate) > iou_threshold
        });
        if !suppressed {
            detections.swap(kept, index);
            kept += 1;
        }
    }
    detections.truncate(kept);
}
