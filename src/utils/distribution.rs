//! Student's t tail probabilities for the trend and correlation p-values.

use statrs::distribution::{ContinuousCDF, StudentsT};

/// Two-sided p-value P(|T| >= |t|) for Student's t with `dof` degrees of freedom
pub fn student_t_two_sided_p(t: f64, dof: f64) -> f64 {
    if t.is_nan() || dof <= 0.0 {
        return f64::NAN;
    }
    if t.is_infinite() {
        return 0.0;
    }

    match StudentsT::new(0.0, 1.0, dof) {
        Ok(dist) => (2.0 * dist.cdf(-t.abs())).clamp(0.0, 1.0),
        Err(_) => f64::NAN,
    }
}

/// Two-sided p-value for a Pearson correlation `r` over `n` pairs (null: r = 0).
///
/// With only two pairs the test has no degrees of freedom and the p-value is 1;
/// a perfect correlation over more pairs has p-value 0.
pub fn correlation_p_value(r: f64, n: usize) -> f64 {
    if r.is_nan() {
        return f64::NAN;
    }
    if n <= 2 {
        return 1.0;
    }

    let r = r.clamp(-1.0, 1.0);
    let one_minus_r2 = (1.0 - r) * (1.0 + r);
    if one_minus_r2 <= 0.0 {
        return 0.0;
    }

    let dof = (n - 2) as f64;
    let t = r * (dof / one_minus_r2).sqrt();
    student_t_two_sided_p(t, dof)
}
