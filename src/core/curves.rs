//! Piecewise-linear penalty curves for posture metrics.
//!
//! Each curve maps one proportional metric to a 0-100 sub-score. A curve is
//! a flat value below its first breakpoint followed by linear segments; a
//! segment applies from its breakpoint up to the next one and evaluates to
//! `intercept + slope * (x - breakpoint)`, never dropping below `floor`.

/// One linear piece of a penalty curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub breakpoint: f64,
    pub intercept: f64,
    pub slope: f64,
    pub floor: f64,
}

const fn seg(breakpoint: f64, intercept: f64, slope: f64, floor: f64) -> Segment {
    Segment {
        breakpoint,
        intercept,
        slope,
        floor,
    }
}

/// A sub-score curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PenaltyCurve {
    /// Value for inputs below the first breakpoint
    pub below: f64,
    /// Segments ordered by ascending breakpoint
    pub segments: &'static [Segment],
}

impl PenaltyCurve {
    /// Evaluate the curve, clamped to 0-100.
    pub fn score(&self, x: f64) -> f64 {
        let raw = match self.segments.iter().rev().find(|s| x >= s.breakpoint) {
            Some(s) => (s.intercept + s.slope * (x - s.breakpoint)).max(s.floor),
            None => self.below,
        };
        raw.clamp(0.0, 100.0)
    }
}

const NO_FLOOR: f64 = f64::NEG_INFINITY;

/// Torso compression, driven by fractional deviation from the calibrated
/// shoulder-hip baseline.
pub const TORSO: PenaltyCurve = PenaltyCurve {
    below: 100.0,
    segments: &[
        seg(0.0, 100.0, -300.0, NO_FLOOR),
        seg(0.15, 55.0, -200.0, NO_FLOOR),
        seg(0.30, 25.0, -100.0, 0.0),
    ],
};

/// Head drop, driven by fractional deviation from the calibrated
/// head-shoulder baseline.
pub const HEAD: PenaltyCurve = PenaltyCurve {
    below: 100.0,
    segments: &[
        seg(0.0, 100.0, -400.0, NO_FLOOR),
        seg(0.15, 40.0, -200.0, NO_FLOOR),
        seg(0.30, 10.0, -50.0, 0.0),
    ],
};

/// Forward head posture, driven directly by the head-forward ratio.
pub const NECK: PenaltyCurve = PenaltyCurve {
    below: 100.0,
    segments: &[
        seg(0.15, 100.0, -500.0, NO_FLOOR),
        seg(0.30, 25.0, -100.0, 20.0),
    ],
};

/// Shoulder symmetry, driven by the shoulder tilt ratio.
pub const SYMMETRY: PenaltyCurve = PenaltyCurve {
    below: 100.0,
    segments: &[
        seg(0.10, 100.0, -500.0, NO_FLOOR),
        seg(0.20, 50.0, -200.0, 50.0),
    ],
};

/// Face visibility, driven by mean confidence of nose and ears.
pub const VISIBILITY: PenaltyCurve = PenaltyCurve {
    below: 30.0,
    segments: &[
        seg(0.0, 0.0, 100.0, 30.0),
        seg(0.7, 70.0, 150.0, NO_FLOOR),
        seg(0.9, 100.0, 0.0, NO_FLOOR),
    ],
};

/// Blend weights for the final score; they sum to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    pub torso: f64,
    pub head: f64,
    pub neck: f64,
    pub visibility: f64,
    pub symmetry: f64,
}

pub const WEIGHTS: Weights = Weights {
    torso: 0.35,
    head: 0.25,
    neck: 0.20,
    visibility: 0.12,
    symmetry: 0.08,
};
