use ordered_float::OrderedFloat;

/// Corner-format box: `[x1, y1, x2, y2]`.
pub type BoxCorners = [f32; 4];

#[inline]
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Index and value of the highest score. Ties resolve to the first index.
pub fn argmax_and_max(scores: &[f32]) -> Option<(usize, f32)> {
    scores
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, val)| match best {
            Some((_, max_val)) if val <= max_val || val.is_nan() => best,
            _ if val.is_nan() => best,
            _ => Some((i, val)),
        })
}

/// Compute the Intersection over Union (IoU) of two corner-format boxes.
pub fn compute_iou(b1: &BoxCorners, b2: &BoxCorners) -> f32 {
    let [x1_1, y1_1, x2_1, y2_1] = *b1;
    let [x1_2, y1_2, x2_2, y2_2] = *b2;

    let inter_x1 = x1_1.max(x1_2);
    let inter_y1 = y1_1.max(y1_2);
    let inter_x2 = x2_1.min(x2_2);
    let inter_y2 = y2_1.min(y2_2);

    let inter_area = ((inter_x2 - inter_x1).max(0.0)) * ((inter_y2 - inter_y1).max(0.0));
    let area1 = (x2_1 - x1_1).max(0.0) * (y2_1 - y1_1).max(0.0);
    let area2 = (x2_2 - x1_2).max(0.0) * (y2_2 - y1_2).max(0.0);
    let union_area = area1 + area2 - inter_area;
    if union_area <= 0.0 { 0.0 } else { inter_area / union_area }
}

/// Greedy single-class NMS.
///
/// Returns the indices of the kept boxes, most confident first, stopping after `max_keep`.
pub fn non_maximum_suppression(
    confs: &[f32],
    boxes: &[BoxCorners],
    iou_threshold: f32,
    max_keep: usize,
) -> Vec<usize> {
    assert_eq!(confs.len(), boxes.len(), "one confidence per box");

    let mut order: Vec<usize> = (0..confs.len()).collect();
    order.sort_by_key(|&i| std::cmp::Reverse(OrderedFloat(confs[i])));

    let mut suppressed = vec![false; order.len()];
    let mut keep = Vec::new();
    for i in 0..order.len() {
        if keep.len() >= max_keep {
            break;
        }
        if suppressed[i] {
            continue;
        }
        let idx_i = order[i];
        keep.push(idx_i);
        for j in (i + 1)..order.len() {
            if suppressed[j] {
                continue;
            }
            if compute_iou(&boxes[idx_i], &boxes[order[j]]) > iou_threshold {
                suppressed[j] = true;
            }
        }
    }
    keep
}
