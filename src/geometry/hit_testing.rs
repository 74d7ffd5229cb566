use egui::{Pos2, Rect};

/// Minimum hit tolerance around a line, in pixels
pub const LINE_HIT_TOLERANCE: f32 = 5.0;

/// Distance from `point` to the segment `a..b` using the clamped projection
/// parameter. A zero-length segment measures to `a`.
pub fn distance_to_segment(point: Pos2, a: Pos2, b: Pos2) -> f32 {
    let segment = b - a;
    let len_sq = segment.length_sq();
    if len_sq == 0.0 {
        return (point - a).length();
    }
    let t = ((point - a).dot(segment) / len_sq).clamp(0.0, 1.0);
    let projection = a + segment * t;
    (point - projection).length()
}

/// Normalized quadratic form test. A zero radius on either axis never hits.
pub fn point_in_ellipse(point: Pos2, rect: Rect) -> bool {
    let rx = rect.width() / 2.0;
    let ry = rect.height() / 2.0;
    if rx <= 0.0 || ry <= 0.0 {
        return false;
    }
    let center = rect.center();
    let dx = (point.x - center.x) / rx;
    let dy = (point.y - center.y) / ry;
    dx * dx + dy * dy <= 1.0
}

/// Rect spanning two arbitrary corners.
pub fn normalized_rect(a: Pos2, b: Pos2) -> Rect {
    Rect::from_two_pos(a, b)
}

/// Index of the first handle within `radius` of `point`.
pub fn handle_hit_index(handles: &[Pos2], point: Pos2, radius: f32) -> Option<usize> {
    let radius_sq = radius * radius;
    handles
        .iter()
        .position(|handle| handle.distance_sq(point) <= radius_sq)
}

/// Bounding box of a set of points, `None` for an empty slice.
pub fn calculate_bounds(points: &[Pos2]) -> Option<Rect> {
    let (first, rest) = points.split_first()?;
    let mut rect = Rect::from_min_max(*first, *first);
    for p in rest {
        rect.extend_with(*p);
    }
    Some(rect)
}
