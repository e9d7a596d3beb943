#![allow(clippy::cast_precision_loss)]
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scenegrasp_algorithms::{
    extract_clusters, segment_scene, ClusteringMethod, PlaneSegmenter,
};
use scenegrasp_core::{ClusteringConfig, Point, PointSet, RoiConfig, SegmentationConfig};
use std::collections::HashSet;

/// Jittered table plus scattered blobs and isolated outliers.
fn noisy_scene(seed: u64) -> PointSet {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut points = Vec::new();

    for i in 0..50 {
        for j in 0..40 {
            points.push(Point::new(
                i as f32 * 0.01,
                j as f32 * 0.01,
                1.0 + rng.gen_range(-0.004..0.004),
            ));
        }
    }

    for &(cx, cy, n) in &[(0.1_f32, 0.1_f32, 300), (0.3, 0.2, 150), (0.4, 0.05, 40)] {
        for _ in 0..n {
            points.push(Point::new(
                cx + rng.gen_range(-0.02..0.02),
                cy + rng.gen_range(-0.02..0.02),
                0.9 + rng.gen_range(-0.02..0.02),
            ));
        }
    }

    for _ in 0..60 {
        points.push(Point::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-0.5..2.0),
        ));
    }

    PointSet::from_vec(points)
}

#[test]
fn test_surface_and_remainder_partition_input() {
    let points = noisy_scene(1);
    let segmenter = PlaneSegmenter::new(SegmentationConfig::default());
    let model = segmenter.fit(&points).expect("surface");

    let inliers: HashSet<usize> = model.inliers.iter().copied().collect();
    assert_eq!(inliers.len(), model.inliers.len(), "duplicate inliers");
    assert!(model.inliers.windows(2).all(|w| w[0] < w[1]));
    assert!(model.inlier_count() <= points.len());

    let seg = segmenter.segment(&points);
    assert_eq!(seg.surface.len() + seg.remainder.len(), points.len());

    // Rebuild the input from both halves and compare position by position.
    let mut surface = seg.surface.iter();
    let mut remainder = seg.remainder.iter();
    for (i, p) in points.iter().enumerate() {
        let taken = if inliers.contains(&i) {
            surface.next()
        } else {
            remainder.next()
        };
        assert_eq!(taken, Some(p));
    }
    assert!(surface.next().is_none());
    assert!(remainder.next().is_none());
}

#[test]
fn test_clusters_disjoint_and_large_enough() {
    let points = noisy_scene(2);
    let config = ClusteringConfig::default()
        .with_tolerance(0.015)
        .with_min_cluster_size(30);
    let result = extract_clusters(&points, &config).unwrap();

    let mut seen = HashSet::new();
    for cluster in &result.clusters {
        assert!(cluster.len() >= 30);
        assert_eq!(cluster.indices.len(), cluster.points.len());
        for (&i, p) in cluster.indices.iter().zip(cluster.points.iter()) {
            assert!(seen.insert(i), "index {i} in two clusters");
            assert_eq!(&points[i], p);
        }
    }
}

#[test]
fn test_decomposition_is_idempotent() {
    let points = noisy_scene(3);
    let roi = RoiConfig::default();
    let segmentation = SegmentationConfig::default();
    let clustering = ClusteringConfig::default().with_min_cluster_size(20);

    let first = segment_scene(&points, &roi, &segmentation, &clustering).unwrap();
    let second = segment_scene(&points, &roi, &segmentation, &clustering).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_inlier_count_monotonic_in_budget() {
    let points = noisy_scene(4);
    let mut previous = 0;
    for budget in 0..=80 {
        let segmenter =
            PlaneSegmenter::new(SegmentationConfig::default().with_max_iterations(budget));
        let count = segmenter
            .best_hypothesis(&points)
            .map_or(0, |best| best.inliers);
        assert!(
            count >= previous,
            "budget {budget}: {count} inliers after {previous}"
        );
        previous = count;
    }
    assert!(previous > 0);
}

#[test]
fn test_euclidean_and_graph_agree() {
    let points = noisy_scene(5);
    for tolerance in [0.008_f32, 0.01, 0.02] {
        let euclidean = ClusteringConfig::default()
            .with_tolerance(tolerance)
            .with_min_cluster_size(5);
        let graph = euclidean.clone().with_method(ClusteringMethod::Graph);

        let a = extract_clusters(&points, &euclidean).unwrap();
        let b = extract_clusters(&points, &graph).unwrap();
        assert_eq!(a.clusters, b.clusters, "tolerance {tolerance}");
        assert_eq!(a.statistics, b.statistics);
    }
}
