// Centralized ingestion limits to harden against untrusted pattern documents

// Document size caps
pub const MAX_KEY_POINTS: usize = 200_000;
pub const MAX_CURVES: usize = 300_000;
pub const MAX_LOOPS: usize = 50_000;
pub const MAX_LOOP_CURVES: usize = 20_000;

// Numeric bounds
pub const COORD_MIN: f32 = -10_000_000.0;
pub const COORD_MAX: f32 =  10_000_000.0;

#[inline]
pub fn in_coord_bounds(x: f32) -> bool { x.is_finite() && x >= COORD_MIN && x <= COORD_MAX }
