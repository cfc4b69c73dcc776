//! Small numeric helpers shared by the blend routines.
//!
//! Quaternions are `[w, x, y, z]`, matching the component order of
//! `rotation_quaternion` curves (array index 0 is `w`).

pub const QUAT_IDENTITY: [f32; 4] = [1.0, 0.0, 0.0, 0.0];

/// Linear interpolation for f32
#[inline]
pub fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
pub fn dot4(a: [f32; 4], b: [f32; 4]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2] + a[3] * b[3]
}

#[inline]
pub fn len4(q: [f32; 4]) -> f32 {
    dot4(q, q).sqrt()
}

#[inline]
pub fn negate4(q: [f32; 4]) -> [f32; 4] {
    [-q[0], -q[1], -q[2], -q[3]]
}

/// Component-wise `a - b`.
#[inline]
pub fn sub4(a: [f32; 4], b: [f32; 4]) -> [f32; 4] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2], a[3] - b[3]]
}

/// Component-wise `a + b * t`.
#[inline]
pub fn add_scaled4(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
    [
        a[0] + b[0] * t,
        a[1] + b[1] * t,
        a[2] + b[2] * t,
        a[3] + b[3] * t,
    ]
}

/// Normalize a quaternion. A zero-length input yields the identity rotation.
#[inline]
pub fn normalize_quat(q: [f32; 4]) -> [f32; 4] {
    let mag = len4(q);
    if mag == 0.0 || !mag.is_finite() {
        QUAT_IDENTITY
    } else {
        [q[0] / mag, q[1] / mag, q[2] / mag, q[3] / mag]
    }
}

/// Spherical interpolation between two unit quaternions on the shortest arc.
/// Falls back to a plain lerp when the inputs are nearly parallel.
pub fn interp_quat(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
    let mut cosom = dot4(a, b);

    // Rotate around the shortest angle.
    let qa = if cosom < 0.0 {
        cosom = -cosom;
        negate4(a)
    } else {
        a
    };

    let (sc1, sc2) = if (1.0 - cosom) > 0.0001 {
        let omega = cosom.clamp(-1.0, 1.0).acos();
        let sinom = omega.sin();
        (((1.0 - t) * omega).sin() / sinom, (t * omega).sin() / sinom)
    } else {
        (1.0 - t, t)
    };

    [
        sc1 * qa[0] + sc2 * b[0],
        sc1 * qa[1] + sc2 * b[1],
        sc1 * qa[2] + sc2 * b[2],
        sc1 * qa[3] + sc2 * b[3],
    ]
}

/// Return `q` or `-q`, whichever lies in the same hemisphere as `reference`.
/// Both represent the same rotation; picking the compatible sign keeps later
/// curve interpolation from swinging the long way around.
#[inline]
pub fn make_compatible_quat(q: [f32; 4], reference: [f32; 4]) -> [f32; 4] {
    if dot4(q, reference) < 0.0 {
        negate4(q)
    } else {
        q
    }
}

/// Cubic Bezier basis function
#[inline]
pub fn cubic_bezier(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
    let u = 1.0 - t;
    u * u * u * p0 + 3.0 * u * u * t * p1 + 3.0 * u * t * t * p2 + t * t * t * p3
}

/// Find the bezier parameter whose x equals `x`, for a monotonic x cubic
/// `(x0, x1, x2, x3)`, by bisection.
pub fn solve_bezier_x(x0: f32, x1: f32, x2: f32, x3: f32, x: f32) -> f32 {
    let mut lo = 0.0f32;
    let mut hi = 1.0f32;
    let span = (x3 - x0).abs().max(f32::EPSILON);
    let mut mid = ((x - x0) / span).clamp(0.0, 1.0);
    for _ in 0..32 {
        let xm = cubic_bezier(x0, x1, x2, x3, mid);
        if (xm - x).abs() < 1e-6 * span {
            break;
        }
        if xm < x {
            lo = mid;
        } else {
            hi = mid;
        }
        mid = 0.5 * (lo + hi);
    }
    mid
}
