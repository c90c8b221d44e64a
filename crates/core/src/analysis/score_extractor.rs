use ndarray::{s, ArrayViewD, Axis, Ix2};

use crate::inference::domain::inference_session::InferenceError;

/// Leading columns of each candidate row that hold box geometry.
const BOX_COLUMNS: usize = 4;

/// Per-candidate maximum class score, keeping only scores above `threshold`.
///
/// Accepts the YOLO `[1, features, candidates]` layout as well as
/// `[1, candidates, features]`; the longer axis is taken as the candidates.
/// Box geometry is ignored. Scores come back in candidate order.
pub fn extract_nsfw_scores(
    detection: ArrayViewD<'_, f32>,
    threshold: f32,
) -> Result<Vec<f32>, InferenceError> {
    let shape = detection.shape().to_vec();
    let squeezed = if detection.ndim() == 3 && shape[0] == 1 {
        detection.index_axis_move(Axis(0), 0)
    } else {
        detection
    };

    let matrix = squeezed
        .into_dimensionality::<Ix2>()
        .map_err(|_| InferenceError::UnexpectedOutputShape(shape.clone()))?;
    let candidates = if matrix.nrows() < matrix.ncols() {
        matrix.reversed_axes()
    } else {
        matrix
    };
    if candidates.ncols() <= BOX_COLUMNS {
        return Err(InferenceError::UnexpectedOutputShape(shape));
    }

    let scores = candidates
        .slice(s![.., BOX_COLUMNS..])
        .rows()
        .into_iter()
        .filter_map(|class_scores| {
            let best = class_scores.fold(f32::NEG_INFINITY, |acc, &v| acc.max(v));
            (best > threshold).then_some(best)
        })
        .collect();
    Ok(scores)
}
