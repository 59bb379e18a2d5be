use std::hint::black_box;

use crate::common::TrackingResult;
use crate::common::tracking::SPINE_NAVEL;

/// Stand-in for a downstream consumer of tracking results. Reads every
/// body's id and one joint position so the result is actually touched.
pub fn consume(result: &TrackingResult) -> f32 {
    let mut acc = result.num_bodies() as f32;
    for body in result.bodies() {
        acc *= body.id as f32 * body.skeleton.joints[SPINE_NAVEL].position.x;
    }
    black_box(acc)
}
