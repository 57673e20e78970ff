//! Property-based tests using proptest.
//!
//! These tests verify invariants of the mixture engine and the tissue mapper
//! on arbitrary small inputs.

use proptest::prelude::*;
use tissuemix::cluster::FitReport;
use tissuemix::prelude::*;
use tissuemix::tissue::MappingBasis;

// Strategy for generating small finite datasets
fn dataset_strategy(rows: usize, cols: usize) -> impl Strategy<Value = Dataset> {
    proptest::collection::vec(-50.0f64..50.0, rows * cols).prop_map(move |data| {
        Dataset::from_features(Matrix::from_vec(rows, cols, data).expect("Test data should be valid"))
            .expect("finite")
    })
}

// Strategy for symmetric positive semi-definite matrices A·Aᵀ
fn psd_strategy(n: usize) -> impl Strategy<Value = Matrix<f64>> {
    proptest::collection::vec(-5.0f64..5.0, n * n).prop_map(move |data| {
        let a = Matrix::from_vec(n, n, data).expect("square");
        a.matmul(&a.transpose()).expect("square product")
    })
}

fn one_d_component(mean: f64) -> Component {
    Component {
        weight: 1.0 / 3.0,
        mean: vec![mean],
        covariance: Matrix::from_vec(1, 1, vec![25.0]).expect("1x1"),
    }
}

// Every bijection of the three tissues.
fn all_label_maps() -> Vec<ClusterLabelMap> {
    let [a, b, c] = Tissue::ALL;
    [[a, b, c], [a, c, b], [b, a, c], [b, c, a], [c, a, b], [c, b, a]]
        .into_iter()
        .map(|t| ClusterLabelMap::new(t).expect("bijection"))
        .collect()
}

fn overlap_score(overlap: &[[f64; 3]; 3], map: &ClusterLabelMap) -> f64 {
    (0..3)
        .map(|c| overlap[c][map.tissue_of(c).expect("three components").index()])
        .sum()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn responsibilities_rows_sum_to_one(data in dataset_strategy(30, 2), seed in 0u64..1000) {
        let model = GaussianMixture::new(3).with_random_state(seed).fit(&data).expect("fit");
        let proba = model.predict_proba(&data).expect("same dim");
        for row in proba.rows() {
            let sum: f64 = row.iter().sum();
            prop_assert!((sum - 1.0).abs() < 1e-6, "row sums to {}", sum);
        }
    }

    #[test]
    fn predict_is_argmax_of_proba(data in dataset_strategy(25, 3), seed in 0u64..1000) {
        let model = GaussianMixture::new(2).with_random_state(seed).fit(&data).expect("fit");
        let labels = model.predict(&data).expect("same dim");
        let proba = model.predict_proba(&data).expect("same dim");
        prop_assert_eq!(labels, proba.argmax_rows());
    }

    #[test]
    fn log_likelihood_trace_non_decreasing(data in dataset_strategy(40, 2), seed in 0u64..1000) {
        let model = GaussianMixture::new(2)
            .with_random_state(seed)
            .with_max_iter(25)
            .fit(&data)
            .expect("fit");
        let trace = &model.report().log_likelihood_trace;
        for pair in trace.windows(2) {
            prop_assert!(
                pair[1] >= pair[0] - 1e-6 * pair[0].abs().max(1.0),
                "log-likelihood fell from {} to {}", pair[0], pair[1]
            );
        }
    }

    #[test]
    fn weights_form_a_distribution(data in dataset_strategy(20, 1), k in 1usize..5) {
        let model = GaussianMixture::new(k).fit(&data).expect("fit");
        let sum: f64 = model.weights().iter().sum();
        prop_assert!((sum - 1.0).abs() < 1e-6);
        prop_assert!(model.weights().iter().all(|&w| w >= 0.0));
    }

    #[test]
    fn regularization_increases_determinant(sigma in psd_strategy(3), reg in 1e-3f64..1.0) {
        let mut regularized = sigma.clone();
        regularized.add_diagonal(reg);
        let before = sigma.determinant().expect("square");
        let after = regularized.determinant().expect("square");
        prop_assert!(after > before, "det {} -> {}", before, after);
    }

    #[test]
    fn mapper_is_bijective_and_deterministic(
        means in proptest::collection::vec(0.0f64..255.0, 3),
        priors in proptest::collection::vec(0.0f64..1.0, 30),
        values in proptest::collection::vec(0.0f64..255.0, 10),
    ) {
        let model = FittedMixture::from_components(
            means.iter().map(|&m| one_d_component(m)).collect(),
            FitReport::default(),
        ).expect("valid components");
        let data = Dataset::from_features(Matrix::from_vec(10, 1, values).expect("10x1")).expect("finite");
        let priors = Matrix::from_vec(10, 3, priors).expect("10x3");

        let mapper = ClusterMapper::default();
        let a = mapper.map_with_priors(&model, &data, &priors).expect("mapping");
        let b = mapper.map_with_priors(&model, &data, &priors).expect("mapping");
        prop_assert_eq!(&a, &b);

        let mut tissues = a.map.tissues().to_vec();
        tissues.sort();
        prop_assert_eq!(tissues, Tissue::ALL.to_vec());
        if a.basis == MappingBasis::IntensityFallback {
            prop_assert!(a.ambiguity.is_some());
        }
    }

    #[test]
    fn mapper_never_trades_overlap_beyond_margin(
        means in proptest::collection::vec(0.0f64..255.0, 3),
        priors in proptest::collection::vec(0.0f64..1.0, 30),
        values in proptest::collection::vec(0.0f64..255.0, 10),
        margin in 0.0f64..0.5,
    ) {
        let model = FittedMixture::from_components(
            means.iter().map(|&m| one_d_component(m)).collect(),
            FitReport::default(),
        ).expect("valid components");
        let data = Dataset::from_features(Matrix::from_vec(10, 1, values).expect("10x1")).expect("finite");
        let priors = Matrix::from_vec(10, 3, priors).expect("10x3");

        let outcome = ClusterMapper::new(MappingConfig { ambiguity_margin: margin })
            .map_with_priors(&model, &data, &priors)
            .expect("mapping");
        let best = all_label_maps()
            .iter()
            .map(|m| overlap_score(&outcome.overlap, m))
            .fold(f64::NEG_INFINITY, f64::max);
        let chosen = overlap_score(&outcome.overlap, &outcome.map);
        prop_assert!(chosen >= best - margin - 1e-12, "chosen {} best {} margin {}", chosen, best, margin);
    }
}
