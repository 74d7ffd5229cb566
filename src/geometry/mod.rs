mod hit_testing;
mod transform;

pub use hit_testing::{
    LINE_HIT_TOLERANCE, calculate_bounds, distance_to_segment, handle_hit_index, normalized_rect,
    point_in_ellipse,
};
pub use transform::{Transform2, rotate_point, unrotate_point};

use egui::{Pos2, Rect};

/// Corner handles of an unrotated box, clockwise from top-left.
pub fn corner_handles(rect: Rect) -> [Pos2; 4] {
    [
        rect.left_top(),
        rect.right_top(),
        rect.right_bottom(),
        rect.left_bottom(),
    ]
}
