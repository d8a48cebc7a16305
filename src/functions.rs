use ordered_float::OrderedFloat;

pub fn mean(xs: impl Iterator<Item = f64>) -> f64 {
    let mut count = 0;
    let mut total = 0.0;
    for x in xs {
        count += 1;
        total += x;
    }
    assert_ne!(count, 0);
    total / count as f64
}

pub fn median(xs: impl Iterator<Item = f64>) -> f64 {
    let mut xs = xs.map(OrderedFloat).collect::<Vec<_>>();
    assert!(!xs.is_empty());
    xs.sort_unstable();

    let mid = xs.len() / 2;
    if xs.len() % 2 == 0 {
        (xs[mid - 1].0 + xs[mid].0) / 2.0
    } else {
        xs[mid].0
    }
}

pub fn mse(xs: impl Iterator<Item = f64>, ys: impl Iterator<Item = f64>) -> f64 {
    mean(xs.zip(ys).map(|(x, y)| (x - y).powi(2)))
}

pub fn mismatch_rate(xs: impl Iterator<Item = f64>, ys: impl Iterator<Item = f64>) -> f64 {
    mean(xs.zip(ys).map(|(x, y)| if (x - y).abs() < 0.5 { 0.0 } else { 1.0 }))
}

pub fn dot(xs: &[f64], ys: &[f64]) -> f64 {
    debug_assert_eq!(xs.len(), ys.len());
    xs.iter().zip(ys.iter()).map(|(x, y)| x * y).sum()
}

pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn median_works() {
        assert_eq!(median([3.0, 1.0, 2.0].iter().copied()), 2.0);
        assert_eq!(median([4.0, 1.0, 3.0, 2.0].iter().copied()), 2.5);
        assert_eq!(median([-1.0].iter().copied()), -1.0);
    }

    #[test]
    fn sigmoid_is_stable_for_large_inputs() {
        assert_abs_diff_eq!(sigmoid(0.0), 0.5);
        assert_abs_diff_eq!(sigmoid(800.0), 1.0);
        assert_abs_diff_eq!(sigmoid(-800.0), 0.0);
        assert!(sigmoid(-800.0).is_finite());
    }

    #[test]
    fn distances_work() {
        let xs = [1.0, 0.0, 1.0, 1.0];
        let ys = [1.0, 1.0, 0.0, 1.0];
        assert_abs_diff_eq!(mse(xs.iter().copied(), ys.iter().copied()), 0.5);
        assert_abs_diff_eq!(
            mismatch_rate(xs.iter().copied(), ys.iter().copied()),
            0.5
        );
    }
}
