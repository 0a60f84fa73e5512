use super::group_norm::{self, GroupNormConfig, GroupStatistics, Precision};
use super::{Add, Div, FrozenGroupNormOp, GroupNormOp, Mean, Operator, Reshape, Sqrt, Sum};
use crate::error::GroupNormError;
use crate::gradcheck::{check_gradients, numeric_gradient};
use crate::tensor::Tensor;
use approx::assert_abs_diff_eq;
use half::f16;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn assert_close(actual: &[f64], expected: &[f64], tolerance: f64) {
    assert_eq!(actual.len(), expected.len(), "Lengths don't match");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a - e).abs() < tolerance,
            "Values differ at index {}: {} vs {}",
            i,
            a,
            e
        );
    }
}

fn random_problem(
    seed: u64,
    shape: [usize; 4],
) -> (Tensor<f64>, Tensor<f64>, Tensor<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let c = shape[1];
    let x = Tensor::randn(&shape, &mut rng);
    let scale = Tensor::randn(&[1, c, 1, 1], &mut rng);
    let shift = Tensor::randn(&[1, c, 1, 1], &mut rng);
    (x, scale, shift)
}

// Normalizes the flat NCHW buffer over blocks of `block` consecutive elements.
// Both layer norm (block = C*H*W) and instance norm (block = H*W) are of this form.
fn normalize_blocks(values: &[f64], block: usize, eps: f64) -> Vec<f64> {
    values
        .chunks(block)
        .flat_map(|chunk| {
            let n = chunk.len() as f64;
            let mean = chunk.iter().sum::<f64>() / n;
            let var = chunk.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            chunk
                .iter()
                .map(move |v| (v - mean) / (var + eps).sqrt())
                .collect::<Vec<_>>()
        })
        .collect()
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[test]
fn test_config_rejects_indivisible_channels() {
    let err = GroupNormConfig::new(5, 3, 1e-5).unwrap_err();
    assert!(matches!(err, GroupNormError::Configuration(_)));
}

#[test]
fn test_config_rejects_zero_groups_and_bad_eps() {
    assert!(matches!(
        GroupNormConfig::new(4, 0, 1e-5),
        Err(GroupNormError::Configuration(_))
    ));
    assert!(matches!(
        GroupNormConfig::new(0, 1, 1e-5),
        Err(GroupNormError::Configuration(_))
    ));
    for eps in [0.0, -1e-5, f64::NAN, f64::INFINITY] {
        assert!(
            GroupNormConfig::new(4, 2, eps).is_err(),
            "eps {} should be rejected",
            eps
        );
    }
}

#[test]
fn test_config_defaults() {
    let config = GroupNormConfig::with_defaults(64).unwrap();
    assert_eq!(config.num_groups(), 32);
    assert_eq!(config.channels_per_group(), 2);
    assert_eq!(config.eps(), 1e-5);
    assert_eq!(config.precision(), Precision::Native);

    // Fewer than 32 channels can't use the default grouping
    assert!(GroupNormConfig::with_defaults(16).is_err());
}

#[test]
fn test_config_from_json() {
    let config = GroupNormConfig::from_json(r#"{"num_channels": 6, "num_groups": 3, "eps": 0.001}"#)
        .unwrap();
    assert_eq!(config.num_channels(), 6);
    assert_eq!(config.precision(), Precision::Native);

    let err = GroupNormConfig::from_json(r#"{"num_channels": 6"#).unwrap_err();
    assert!(matches!(err, GroupNormError::ConfigFile(_)));

    let err =
        GroupNormConfig::from_json(r#"{"num_channels": 6, "num_groups": 4, "eps": 0.001}"#)
            .unwrap_err();
    assert!(matches!(err, GroupNormError::Configuration(_)));
}

#[test]
fn test_infer_shape() {
    let config = GroupNormConfig::new(4, 2, 1e-5).unwrap();
    assert_eq!(config.infer_shape(&[8, 4, 16, 16]).unwrap(), [8, 4, 16, 16]);
    assert!(matches!(
        config.infer_shape(&[4, 16, 16]),
        Err(GroupNormError::ShapeMismatch(_))
    ));
    assert!(matches!(
        config.infer_shape(&[8, 3, 16, 16]),
        Err(GroupNormError::ShapeMismatch(_))
    ));
    for empty in [[0, 4, 16, 16], [8, 4, 0, 16], [8, 4, 16, 0]] {
        assert!(matches!(
            config.infer_shape(&empty),
            Err(GroupNormError::ShapeMismatch(_))
        ));
    }
}

// ============================================================================
// FORWARD
// ============================================================================

#[test]
fn test_forward_concrete_example() {
    // Groups {1, 2} and {3, 4}: means 1.5 and 3.5, variance 0.25 each
    let config = GroupNormConfig::new(4, 2, 1e-12).unwrap();
    let x = Tensor::<f64>::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[1, 4, 1, 1]).unwrap();
    let scale = Tensor::ones(&[4]);
    let shift = Tensor::zeros(&[4]);

    let (y, cache) = group_norm::forward(&x, &scale, &shift, &config).unwrap();

    assert_close(&y.to_vec(), &[-1.0, 1.0, -1.0, 1.0], 1e-5);
    assert_close(&cache.mean.to_vec(), &[1.5, 3.5], 1e-12);
    assert_close(&cache.var.to_vec(), &[0.25, 0.25], 1e-12);
    assert_eq!(cache.x_group.shape(), &[1, 2, 2, 1, 1]);
    assert_eq!(cache.mean.shape(), &[1, 2, 1, 1, 1]);
}

#[test]
fn test_forward_preserves_shape() {
    let config = GroupNormConfig::new(6, 3, 1e-5).unwrap();
    let (x, scale, shift) = random_problem(1, [3, 6, 5, 4]);

    let (y, cache) = config.forward(&x, &scale, &shift).unwrap();
    assert_eq!(y.shape(), x.shape());
    assert_eq!(cache.normalized.shape(), x.shape());
    assert_eq!(cache.input_shape(), &[3, 6, 5, 4]);
}

#[test]
fn test_normalized_groups_have_zero_mean_unit_variance() {
    let config = GroupNormConfig::new(8, 4, 1e-8).unwrap();
    let (x, _, _) = random_problem(2, [2, 8, 3, 3]);
    let x = x.mul_scalar(5.0).add_scalar(3.0);

    let (_, cache) =
        group_norm::forward(&x, &Tensor::ones(&[8]), &Tensor::zeros(&[8]), &config).unwrap();

    let grouped = cache.normalized.reshape(&[2, 4, 2, 3, 3]).unwrap();
    let means = grouped.mean_axes(&[2, 3, 4], false).unwrap();
    let vars = grouped.square().mean_axes(&[2, 3, 4], false).unwrap();
    for m in means.to_vec() {
        assert_abs_diff_eq!(m, 0.0, epsilon = 1e-10);
    }
    for v in vars.to_vec() {
        assert_abs_diff_eq!(v, 1.0, epsilon = 1e-6);
    }
}

#[test]
fn test_affine_identity_leaves_normalized_output() {
    let config = GroupNormConfig::new(4, 2, 1e-5).unwrap();
    let (x, _, _) = random_problem(3, [2, 4, 2, 2]);

    let (y, cache) =
        group_norm::forward(&x, &Tensor::ones(&[1, 4, 1, 1]), &Tensor::zeros(&[1, 4, 1, 1]), &config)
            .unwrap();
    assert_eq!(y, cache.normalized);
}

#[test]
fn test_affine_is_applied_per_channel() {
    let config = GroupNormConfig::new(2, 1, 1e-12).unwrap();
    let x = Tensor::<f64>::from_vec(vec![0.0, 2.0], &[1, 2, 1, 1]).unwrap();
    let scale = Tensor::from_vec(vec![2.0, 3.0], &[2]).unwrap();
    let shift = Tensor::from_vec(vec![10.0, -10.0], &[2]).unwrap();

    let (y, _) = group_norm::forward(&x, &scale, &shift, &config).unwrap();
    assert_close(&y.to_vec(), &[8.0, -7.0], 1e-5);
}

#[test]
fn test_single_group_matches_layer_norm() {
    let eps = 1e-5;
    let config = GroupNormConfig::new(4, 1, eps).unwrap();
    let (x, _, _) = random_problem(4, [3, 4, 2, 3]);

    let (_, cache) =
        group_norm::forward(&x, &Tensor::ones(&[4]), &Tensor::zeros(&[4]), &config).unwrap();
    let reference = normalize_blocks(&x.to_vec(), 4 * 2 * 3, eps);
    assert_close(&cache.normalized.to_vec(), &reference, 1e-10);
}

#[test]
fn test_one_group_per_channel_matches_instance_norm() {
    let eps = 1e-5;
    let config = GroupNormConfig::new(4, 4, eps).unwrap();
    let (x, _, _) = random_problem(5, [3, 4, 2, 3]);

    let (_, cache) =
        group_norm::forward(&x, &Tensor::ones(&[4]), &Tensor::zeros(&[4]), &config).unwrap();
    let reference = normalize_blocks(&x.to_vec(), 2 * 3, eps);
    assert_close(&cache.normalized.to_vec(), &reference, 1e-10);
}

#[test]
fn test_forward_shape_errors() {
    let config = GroupNormConfig::new(4, 2, 1e-5).unwrap();
    let ones = Tensor::<f64>::ones(&[4]);
    let zeros = Tensor::<f64>::zeros(&[4]);

    let rank3 = Tensor::<f64>::ones(&[4, 2, 2]);
    assert!(matches!(
        group_norm::forward(&rank3, &ones, &zeros, &config),
        Err(GroupNormError::ShapeMismatch(_))
    ));

    let wrong_channels = Tensor::<f64>::ones(&[1, 6, 2, 2]);
    assert!(matches!(
        group_norm::forward(&wrong_channels, &ones, &zeros, &config),
        Err(GroupNormError::ShapeMismatch(_))
    ));

    let x = Tensor::<f64>::ones(&[1, 4, 2, 2]);
    let bad_scale = Tensor::<f64>::ones(&[1, 4, 2, 1]);
    assert!(matches!(
        group_norm::forward(&x, &bad_scale, &zeros, &config),
        Err(GroupNormError::ShapeMismatch(_))
    ));
    let bad_shift = Tensor::<f64>::zeros(&[3]);
    assert!(matches!(
        group_norm::forward(&x, &ones, &bad_shift, &config),
        Err(GroupNormError::ShapeMismatch(_))
    ));
}

#[test]
fn test_wide_precision_survives_f16_overflow() {
    // 128 values near 1000 per group: an f16 running sum passes 65504 and
    // overflows, an f64 accumulator doesn't.
    let mut rng = StdRng::seed_from_u64(6);
    let reference = Tensor::<f64>::randn(&[1, 2, 8, 8], &mut rng).map(|v| 1000.0 + 20.0 * v);
    let half_x: Tensor<f16> = reference.cast();
    let exact_x: Tensor<f64> = half_x.cast();

    let native = GroupNormConfig::new(2, 1, 1e-5).unwrap();
    let wide = native.clone().with_precision(Precision::Wide);
    let scale = Tensor::<f16>::ones(&[2]);
    let shift = Tensor::<f16>::zeros(&[2]);

    let (expected, _) = group_norm::forward(&exact_x, &Tensor::ones(&[2]), &Tensor::zeros(&[2]), &native)
        .unwrap();
    let (wide_y, _) = group_norm::forward(&half_x, &scale, &shift, &wide).unwrap();
    let (native_y, _) = group_norm::forward(&half_x, &scale, &shift, &native).unwrap();

    assert!(native_y.to_f64_vec().iter().any(|v| !v.is_finite()));
    assert!(wide_y.cast::<f64>().max_abs_diff(&expected).unwrap() < 0.1);
}

#[test]
fn test_wide_precision_on_f64_is_a_no_op() {
    let native = GroupNormConfig::new(4, 2, 1e-5).unwrap();
    let wide = native.clone().with_precision(Precision::Wide);
    let (x, scale, shift) = random_problem(7, [2, 4, 3, 3]);

    let (a, _) = group_norm::forward(&x, &scale, &shift, &native).unwrap();
    let (b, _) = group_norm::forward(&x, &scale, &shift, &wide).unwrap();
    assert!(a.max_abs_diff(&b).unwrap() < 1e-12);
}

#[test]
fn test_batch_statistics_average_over_samples() {
    let config = GroupNormConfig::new(2, 2, 1e-5).unwrap();
    // Sample 0 channels: {1, 3}, {0, 0}; sample 1 channels: {5, 7}, {2, 2}
    let x = Tensor::<f64>::from_vec(
        vec![1.0, 3.0, 0.0, 0.0, 5.0, 7.0, 2.0, 2.0],
        &[2, 2, 1, 2],
    )
    .unwrap();

    let stats = group_norm::batch_statistics(&x, &config).unwrap();
    assert_eq!(stats.mean.shape(), &[2]);
    assert_close(&stats.mean.to_vec(), &[4.0, 1.0], 1e-12);
    assert_close(&stats.var.to_vec(), &[1.0, 0.0], 1e-12);
}

#[test]
fn test_forward_with_stats_uses_given_statistics() {
    let config = GroupNormConfig::new(2, 2, 1e-12).unwrap();
    let x = Tensor::<f64>::from_vec(vec![3.0, 5.0], &[1, 2, 1, 1]).unwrap();
    let stats = GroupStatistics {
        mean: Tensor::from_vec(vec![1.0, 1.0], &[2]).unwrap(),
        var: Tensor::from_vec(vec![4.0, 16.0], &[2]).unwrap(),
    };
    let y = group_norm::forward_with_stats(&x, &Tensor::ones(&[2]), &Tensor::zeros(&[2]), &stats, &config)
        .unwrap();
    assert_close(&y.to_vec(), &[1.0, 1.0], 1e-9);

    let bad_stats = GroupStatistics {
        mean: Tensor::zeros(&[3]),
        var: Tensor::ones(&[3]),
    };
    assert!(
        group_norm::forward_with_stats(&x, &Tensor::ones(&[2]), &Tensor::zeros(&[2]), &bad_stats, &config)
            .is_err()
    );
}

// ============================================================================
// BACKWARD
// ============================================================================

#[test]
fn test_backward_matches_finite_differences() {
    let config = GroupNormConfig::new(6, 3, 1e-5).unwrap();
    let (x, scale, shift) = random_problem(8, [2, 6, 2, 3]);

    let report = check_gradients(&config, &x, &scale, &shift, 1e-5).unwrap();
    assert!(report.input < 1e-6, "{}", report);
    assert!(report.scale < 1e-6, "{}", report);
    assert!(report.shift < 1e-6, "{}", report);
}

#[test]
fn test_backward_wide_matches_native_on_f64() {
    let native = GroupNormConfig::new(4, 2, 1e-5).unwrap();
    let wide = native.clone().with_precision(Precision::Wide);
    let (x, scale, shift) = random_problem(9, [2, 4, 2, 2]);
    let dout = Tensor::ones(&[2, 4, 2, 2]).mul_scalar(0.5);

    let (_, cache) = native.forward(&x, &scale, &shift).unwrap();
    let a = native.backward(&dout, &cache, &scale).unwrap();
    let b = wide.backward(&dout, &cache, &scale).unwrap();
    assert!(a.dx.max_abs_diff(&b.dx).unwrap() < 1e-12);
    assert!(a.dscale.max_abs_diff(&b.dscale).unwrap() < 1e-12);
}

#[test]
fn test_backward_shapes_and_shift_gradient() {
    let config = GroupNormConfig::new(4, 2, 1e-5).unwrap();
    let (x, _, shift) = random_problem(10, [3, 4, 2, 2]);
    let scale = Tensor::ones(&[1, 4, 1, 1]);
    let dout = Tensor::ones(&[3, 4, 2, 2]);

    let (_, cache) = group_norm::forward(&x, &scale, &shift, &config).unwrap();
    let grads = group_norm::backward(&dout, &cache, &scale, &config).unwrap();

    assert_eq!(grads.dx.shape(), &[3, 4, 2, 2]);
    assert_eq!(grads.dscale.shape(), &[1, 4, 1, 1]);
    assert_eq!(grads.dshift.shape(), &[1, 4, 1, 1]);
    // dshift counts N*H*W ones per channel
    assert_close(&grads.dshift.to_vec(), &[12.0; 4], 1e-12);
    // With unit scale a uniform upstream gradient is orthogonal to the normalization
    for v in grads.dx.to_vec() {
        assert_abs_diff_eq!(v, 0.0, epsilon = 1e-9);
    }
}

#[test]
fn test_backward_rejects_mismatched_gradient() {
    let config = GroupNormConfig::new(4, 2, 1e-5).unwrap();
    let (x, scale, shift) = random_problem(11, [2, 4, 2, 2]);
    let (_, cache) = group_norm::forward(&x, &scale, &shift, &config).unwrap();

    let dout = Tensor::ones(&[1, 4, 2, 2]);
    assert!(matches!(
        group_norm::backward(&dout, &cache, &scale, &config),
        Err(GroupNormError::ShapeMismatch(_))
    ));
}

#[test]
fn test_constant_group_has_finite_gradients() {
    let config = GroupNormConfig::new(2, 1, 1e-5).unwrap();
    let x = Tensor::<f64>::full(&[1, 2, 2, 2], 3.0);
    let scale = Tensor::ones(&[2]);
    let shift = Tensor::zeros(&[2]);

    let (y, cache) = group_norm::forward(&x, &scale, &shift, &config).unwrap();
    assert!(y.to_vec().iter().all(|&v| v == 0.0));

    let dout = Tensor::from_vec((0..8).map(|v| v as f64).collect(), &[1, 2, 2, 2]).unwrap();
    let grads = group_norm::backward(&dout, &cache, &scale, &config).unwrap();
    assert!(grads.dx.to_vec().iter().all(|v| v.is_finite()));
    assert!(grads.dscale.to_vec().iter().all(|v| v.is_finite()));
}

// ============================================================================
// OPERATORS
// ============================================================================

#[test]
fn test_group_norm_op_matches_kernel() {
    let config = GroupNormConfig::new(4, 2, 1e-5).unwrap();
    let (x, scale, shift) = random_problem(12, [2, 4, 3, 2]);
    let op = GroupNormOp::new(config.clone());

    let y = op.compute(&[&x, &scale, &shift]).unwrap();
    let (expected, cache) = group_norm::forward(&x, &scale, &shift, &config).unwrap();
    assert_eq!(y, expected);

    let dout = Tensor::<f64>::randn(&[2, 4, 3, 2], &mut StdRng::seed_from_u64(13));
    let grads = op.gradient(&dout, &[&x, &scale, &shift], &y).unwrap();
    let reference = group_norm::backward(&dout, &cache, &scale, &config).unwrap();

    assert_eq!(grads.len(), 3);
    assert_eq!(grads[0], reference.dx);
    assert_eq!(grads[1], reference.dscale);
    assert_eq!(grads[2], reference.dshift);
    assert_eq!(Operator::<f64>::name(&op), "GroupNormOp");
    assert_eq!(Operator::<f64>::num_inputs(&op), 3);
}

#[test]
fn test_group_norm_op_keeps_parameter_shapes() {
    let config = GroupNormConfig::new(4, 2, 1e-5).unwrap();
    let (x, _, _) = random_problem(14, [1, 4, 2, 2]);
    let scale = Tensor::<f64>::ones(&[4]);
    let shift = Tensor::<f64>::zeros(&[4]);
    let op = GroupNormOp::new(config);

    let y = op.compute(&[&x, &scale, &shift]).unwrap();
    let grads = op.gradient(&Tensor::ones(y.shape()), &[&x, &scale, &shift], &y).unwrap();
    assert_eq!(grads[1].shape(), &[4]);
    assert_eq!(grads[2].shape(), &[4]);

    assert!(matches!(
        op.compute(&[&x, &scale]),
        Err(GroupNormError::Graph(_))
    ));
}

#[test]
fn test_frozen_op_gradient_is_the_affine_map() {
    let config = GroupNormConfig::new(4, 2, 1e-5).unwrap();
    let (x, scale, shift) = random_problem(15, [2, 4, 2, 2]);
    let stats = GroupStatistics {
        mean: Tensor::from_vec(vec![0.3, -0.2], &[2]).unwrap(),
        var: Tensor::from_vec(vec![1.5, 0.7], &[2]).unwrap(),
    };
    let op = FrozenGroupNormOp::new(config.clone(), stats.clone());
    let weights = Tensor::<f64>::randn(&[2, 4, 2, 2], &mut StdRng::seed_from_u64(16));

    let y = op.compute(&[&x, &scale, &shift]).unwrap();
    let expected = group_norm::forward_with_stats(&x, &scale, &shift, &stats, &config).unwrap();
    assert_eq!(y, expected);

    let grads = op.gradient(&weights, &[&x, &scale, &shift], &y).unwrap();
    let loss = |xp: &Tensor<f64>, sp: &Tensor<f64>| -> crate::error::Result<f64> {
        Ok(op.compute(&[xp, sp, &shift])?.mul(&weights)?.sum_all())
    };
    let numeric_dx = numeric_gradient(|xp| loss(xp, &scale), &x, 1e-5).unwrap();
    let numeric_dscale = numeric_gradient(|sp| loss(&x, sp), &scale, 1e-5).unwrap();

    assert!(grads[0].max_abs_diff(&numeric_dx).unwrap() < 1e-6);
    assert!(grads[1].max_abs_diff(&numeric_dscale).unwrap() < 1e-6);
    assert_eq!(grads[2], weights.sum_axes(&[0, 2, 3], true).unwrap());
    assert_eq!(Operator::<f64>::name(&op), "FrozenGroupNormOp");
}

#[test]
fn test_broadcasting_op_gradients_reduce_to_input_shape() {
    let a = Tensor::<f64>::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
    let b = Tensor::<f64>::from_vec(vec![2.0, 4.0], &[1, 2]).unwrap();
    let grad = Tensor::ones(&[2, 2]);

    let add_out = Add.compute(&[&a, &b]).unwrap();
    let add_grads = Add.gradient(&grad, &[&a, &b], &add_out).unwrap();
    assert_eq!(add_grads[0].shape(), &[2, 2]);
    assert_eq!(add_grads[1].to_vec(), vec![2.0, 2.0]);

    let div_out = Div.compute(&[&a, &b]).unwrap();
    let div_grads = Div.gradient(&grad, &[&a, &b], &div_out).unwrap();
    assert_close(&div_grads[0].to_vec(), &[0.5, 0.25, 0.5, 0.25], 1e-12);
    // d(a/b)/db = -a/b^2, summed over rows
    assert_close(&div_grads[1].to_vec(), &[-(1.0 + 3.0) / 4.0, -(2.0 + 4.0) / 16.0], 1e-12);
}

#[test]
fn test_reduction_and_shape_op_gradients() {
    let x = Tensor::<f64>::from_vec(vec![1.0, 4.0, 9.0, 16.0], &[2, 2]).unwrap();

    let mean = Mean::along_axes(vec![1], true);
    let out = mean.compute(&[&x]).unwrap();
    assert_eq!(out.to_vec(), vec![2.5, 12.5]);
    let grads = mean.gradient(&Tensor::ones(&[2, 1]), &[&x], &out).unwrap();
    assert_eq!(grads[0].to_vec(), vec![0.5; 4]);

    let repeated = Mean::along_axes(vec![1, 1], true);
    let out = repeated.compute(&[&x]).unwrap();
    assert_eq!(out.to_vec(), vec![2.5, 12.5]);
    let grads = repeated.gradient(&Tensor::ones(&[2, 1]), &[&x], &out).unwrap();
    assert_eq!(grads[0].to_vec(), vec![0.5; 4]);

    let total = Sum.compute(&[&x]).unwrap();
    assert_eq!(total.shape(), &[] as &[usize]);
    let grads = Sum.gradient(&Tensor::full(&[], 2.0), &[&x], &total).unwrap();
    assert_eq!(grads[0].to_vec(), vec![2.0; 4]);

    let root = Sqrt.compute(&[&x]).unwrap();
    let grads = Sqrt.gradient(&Tensor::ones(&[2, 2]), &[&x], &root).unwrap();
    assert_close(&grads[0].to_vec(), &[0.5, 0.25, 1.0 / 6.0, 0.125], 1e-12);

    let reshape = Reshape::new(vec![4]);
    let flat = reshape.compute(&[&x]).unwrap();
    let grads = reshape.gradient(&Tensor::ones(&[4]), &[&x], &flat).unwrap();
    assert_eq!(grads[0].shape(), &[2, 2]);
}
