use crate::model::Vec2;

/// Squared distance from `p` to segment `a..b`, and the parameter of the
/// nearest point on the segment.
pub fn seg_distance_sq(p: Vec2, a: Vec2, b: Vec2) -> (f32, f32) {
    let v = b - a;
    let w = p - a;
    let vv = v.length_sq();
    let mut t = if vv > 0.0 { w.dot(v) / vv } else { 0.0 };
    if t < 0.0 { t = 0.0; } else if t > 1.0 { t = 1.0; }
    let proj = a + v * t;
    ((p - proj).length_sq(), t)
}

pub fn point_seg_distance(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    seg_distance_sq(p, a, b).0.sqrt()
}

/// Even-odd containment test against a closed polygon. Also reports the
/// polygon edge nearest to `p` (edge `i` runs from vertex `i` to `i + 1`) and
/// the distance to it.
pub fn point_in_polygon(poly: &[Vec2], p: Vec2) -> (bool, usize, f32) {
    let n = poly.len();
    if n == 0 {
        return (false, 0, f32::INFINITY);
    }
    let mut inside = false;
    let mut best_edge = 0usize;
    let mut best_d2 = f32::INFINITY;
    for i in 0..n {
        let a = poly[i];
        let b = poly[(i + 1) % n];
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x_cross {
                inside = !inside;
            }
        }
        let (d2, _) = seg_distance_sq(p, a, b);
        if d2 < best_d2 {
            best_d2 = d2;
            best_edge = i;
        }
    }
    (inside, best_edge, best_d2.sqrt())
}

/// Shoelace signed area; positive for counter-clockwise input.
pub fn polygon_area(poly: &[Vec2]) -> f32 {
    let mut a = 0.0f32;
    for i in 0..poly.len() {
        let j = (i + 1) % poly.len();
        a += poly[i].cross(poly[j]);
    }
    0.5 * a
}

/// Evaluate a Bézier curve of any degree by de Casteljau.
pub fn bezier_point(ctrl: &[Vec2], t: f32) -> Vec2 {
    match ctrl.len() {
        0 => Vec2::default(),
        1 => ctrl[0],
        2 => ctrl[0].lerp(ctrl[1], t),
        _ => {
            let mut tmp: Vec<Vec2> = ctrl.to_vec();
            let n = tmp.len();
            for level in 1..n {
                for i in 0..(n - level) {
                    tmp[i] = tmp[i].lerp(tmp[i + 1], t);
                }
            }
            tmp[0]
        }
    }
}

pub fn polyline_length(pts: &[Vec2]) -> f32 {
    pts.windows(2).map(|w| w[0].distance(w[1])).sum()
}
