//! Escape-time evaluation of a single point.
//!
//! The iteration is generic over [`Real`] so each tier gets its own
//! monomorphized loop; [`evaluate`] picks the loop from the coordinate's tier.

use fracterm_core::{
    Complex, Coordinate, FractalParams, Formula, IterationCell, NumericDegenerate, Real, Scalar,
};

/// Iterate the configured recurrence for the point `coord`.
///
/// The magnitude test `|z| > bailout` runs before each step, so a point that
/// escapes at step `n` reports `iterations = n`. Points still inside after
/// `max_iterations` steps are reported as bounded.
pub fn evaluate(
    coord: &Coordinate,
    params: &FractalParams,
) -> Result<IterationCell, NumericDegenerate> {
    match (coord.re(), coord.im()) {
        (Scalar::Native(re), Scalar::Native(im)) => iterate(Complex::new(*re, *im), params),
        (Scalar::Extended(re), Scalar::Extended(im)) => iterate(Complex::new(*re, *im), params),
        (Scalar::Arbitrary(re), Scalar::Arbitrary(im)) => {
            iterate(Complex::new(re.clone(), im.clone()), params)
        }
        // Components of one coordinate always share a tier; re-pair them.
        (re, im) => evaluate(&Coordinate::new(re.clone(), im.clone())?, params),
    }
}

/// Escape-time loop at one tier.
pub fn iterate<T: Real>(
    c: Complex<T>,
    params: &FractalParams,
) -> Result<IterationCell, NumericDegenerate> {
    let bits = c.re.precision_bits();
    let zero = T::from_f64_at(0.0, bits)?;
    let bailout_sq = params.bailout * params.bailout;
    let degree = params.formula.degree();

    let (mut z, addend) = match params.formula {
        Formula::Julia { seed_re, seed_im } => {
            let seed = Complex::new(
                T::from_f64_at(seed_re, bits)?,
                T::from_f64_at(seed_im, bits)?,
            );
            (c, seed)
        }
        _ => (Complex::new(zero.clone(), zero), c),
    };

    for n in 0..params.max_iterations {
        let norm_sq = z.norm_sq().to_f64();
        // NaN and infinity both escape
        if !(norm_sq <= bailout_sq) {
            return Ok(IterationCell::escaped(
                n,
                smoothing(norm_sq, params.bailout, degree),
            ));
        }
        z = match params.formula {
            Formula::Mandelbrot | Formula::Julia { .. } => z.square().add(&addend),
            Formula::BurningShip => z.abs_parts().square().add(&addend),
            Formula::PowerN { exponent } => z.powu(exponent).add(&addend),
        };
    }

    Ok(IterationCell::bounded(params.max_iterations))
}

/// Continuous correction `1 - log_d(ln|z| / ln R)` for an escaped orbit.
///
/// Zero when the radius is at most 1 (ln R would not be positive) or the
/// magnitude overflowed.
pub fn smoothing(norm_sq: f64, bailout: f64, degree: u32) -> f32 {
    if bailout <= 1.0 || !norm_sq.is_finite() || norm_sq <= 1.0 {
        return 0.0;
    }
    let ln_z = 0.5 * norm_sq.ln();
    let nu = 1.0 - (ln_z / bailout.ln()).ln() / (degree.max(2) as f64).ln();
    nu.clamp(0.0, 1.0) as f32
}
