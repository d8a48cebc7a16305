use crate::functions;
use rand::seq::SliceRandom as _;
use rand::Rng;

/// How the audited column is overwritten before re-predicting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PerturbationStrategy {
    /// Every value becomes `0`.
    ConstantZero,

    /// Every value becomes the column median.
    ConstantMedian,

    /// Values are shuffled across rows.
    GlobalPermutation,
}

impl Default for PerturbationStrategy {
    fn default() -> Self {
        Self::ConstantZero
    }
}

impl PerturbationStrategy {
    pub fn perturb<R: Rng + ?Sized>(self, column: &mut [f64], rng: &mut R) {
        match self {
            Self::ConstantZero => column.iter_mut().for_each(|x| *x = 0.0),
            Self::ConstantMedian => {
                let m = functions::median(column.iter().copied());
                column.iter_mut().for_each(|x| *x = m);
            }
            Self::GlobalPermutation => column.shuffle(rng),
        }
    }
}

/// Removes from every column other than `feature` its component along
/// `columns[feature]`.
///
/// An all-zero audited column leaves `columns` untouched.
pub fn orthogonalize(columns: &mut [Vec<f64>], feature: usize) {
    let basis = columns[feature].clone();
    let norm = functions::dot(&basis, &basis);
    if norm == 0.0 {
        return;
    }

    for (i, column) in columns.iter_mut().enumerate() {
        if i == feature {
            continue;
        }
        let coef = functions::dot(&basis, column) / norm;
        for (x, b) in column.iter_mut().zip(basis.iter()) {
            *x -= coef * b;
        }
    }
}
