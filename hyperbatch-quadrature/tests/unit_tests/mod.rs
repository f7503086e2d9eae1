
fn factorial(n: i32) -> f64 {
    (1..=n).map(|k| k as f64).product()
}

fn monomial_integral_1d(alpha: i32) -> f64 {
    (1.0 - (-1.0f64).powi(alpha + 1)) / (alpha as f64 + 1.0)
}
