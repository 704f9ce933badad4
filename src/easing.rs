//! Easing curves applied to timeline progress.

use serde::{Deserialize, Serialize};

/// Shape of the workspace slide.
///
/// `Linear` keeps the interpolated offset proportional to elapsed time,
/// which is what mid-flight redirection assumes when it picks up the
/// current value as the new start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Easing {
    #[default]
    Linear,
    /// CSS `ease`, i.e. `cubic-bezier(0.25, 0.1, 0.25, 1.0)`.
    Ease,
    EaseOutCubic,
}

impl Easing {
    /// Map linear progress `t` in `[0, 1]` onto the curve.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::Ease => cubic_bezier(t, 0.25, 0.10, 0.25, 1.00),
            Easing::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
        }
    }
}

/// Evaluate a CSS-like cubic Bézier with control points (0,0), (x1,y1),
/// (x2,y2), (1,1) at normalized time `u`.
pub fn cubic_bezier(u: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    // Polynomial coefficients with endpoints fixed at (0,0) and (1,1).
    let cx = 3.0 * x1;
    let bx = 3.0 * (x2 - x1) - cx;
    let ax = 1.0 - cx - bx;

    let cy = 3.0 * y1;
    let by = 3.0 * (y2 - y1) - cy;
    let ay = 1.0 - cy - by;

    let sample = |a: f64, b: f64, c: f64, t: f64| ((a * t + b) * t + c) * t;

    let u = u.clamp(0.0, 1.0);
    let t = solve_t_for_x(u, ax, bx, cx);
    sample(ay, by, cy, t)
}

/// Solve `x(t) = u` for `t` in `[0, 1]`: Newton-Raphson first, bisection if
/// it wanders off.
fn solve_t_for_x(u: f64, ax: f64, bx: f64, cx: f64) -> f64 {
    let mut t = u;
    for _ in 0..8 {
        let x = ((ax * t + bx) * t + cx) * t - u;
        if x.abs() < 1e-9 {
            return t;
        }
        let dx = (3.0 * ax * t + 2.0 * bx) * t + cx;
        if dx.abs() < 1e-9 {
            break;
        }
        t -= x / dx;
        if !(0.0..=1.0).contains(&t) {
            break;
        }
    }

    let mut lo = 0.0;
    let mut hi = 1.0;
    t = u;
    for _ in 0..48 {
        let x = ((ax * t + bx) * t + cx) * t;
        if (x - u).abs() < 1e-10 {
            return t;
        }
        if x < u {
            lo = t;
        } else {
            hi = t;
        }
        t = 0.5 * (lo + hi);
    }
    t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_fixed() {
        for easing in [Easing::Linear, Easing::Ease, Easing::EaseOutCubic] {
            assert!(easing.apply(0.0).abs() < 1e-6, "{:?}", easing);
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-6, "{:?}", easing);
        }
    }

    #[test]
    fn linear_is_identity() {
        assert_eq!(Easing::Linear.apply(0.5), 0.5);
        assert_eq!(Easing::Linear.apply(0.25), 0.25);
    }

    #[test]
    fn out_of_range_progress_is_clamped() {
        assert_eq!(Easing::Linear.apply(1.7), 1.0);
        assert_eq!(Easing::EaseOutCubic.apply(-0.2), 0.0);
    }

    #[test]
    fn ease_is_monotonic_and_front_loaded() {
        let mut prev = 0.0;
        for i in 1..=20 {
            let v = Easing::Ease.apply(i as f64 / 20.0);
            assert!(v >= prev);
            prev = v;
        }
        assert!(Easing::Ease.apply(0.5) > 0.5);
    }

    #[test]
    fn deserializes_kebab_case_names() {
        let e: Easing = serde_json::from_str(r#""ease-out-cubic""#).unwrap();
        assert_eq!(e, Easing::EaseOutCubic);
        let e: Easing = serde_json::from_str(r#""linear""#).unwrap();
        assert_eq!(e, Easing::Linear);
    }
}
