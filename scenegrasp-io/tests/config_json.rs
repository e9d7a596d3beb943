use scenegrasp_core::{Axis, ClusteringMethod, ScenegraspConfig};

#[test]
fn test_partial_config_keeps_defaults() {
    let json = r#"{
        "topic": "/camera/depth/points",
        "roi": { "axis": "y", "max": 2.0 },
        "clustering": { "method": "graph", "min_cluster_size": 100 }
    }"#;
    let config: ScenegraspConfig = serde_json::from_str(json).unwrap();

    assert_eq!(config.topic, "/camera/depth/points");
    assert_eq!(config.roi.axis, Axis::Y);
    assert_eq!(config.roi.min, 0.0);
    assert_eq!(config.roi.max, 2.0);
    assert_eq!(config.clustering.method, ClusteringMethod::Graph);
    assert_eq!(config.clustering.min_cluster_size, 100);
    assert_eq!(config.segmentation, ScenegraspConfig::default().segmentation);
    assert!(config.validate().is_ok());
}

#[test]
fn test_out_of_range_values_fail_validation() {
    let json = r#"{ "roi": { "min": 1.0, "max": 0.5 } }"#;
    let config: ScenegraspConfig = serde_json::from_str(json).unwrap();
    assert!(config.validate().is_err());

    let json = r#"{ "clustering": { "tolerance": -0.01 } }"#;
    let config: ScenegraspConfig = serde_json::from_str(json).unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_unknown_method_is_rejected() {
    let json = r#"{ "clustering": { "method": "kmeans" } }"#;
    assert!(serde_json::from_str::<ScenegraspConfig>(json).is_err());
}

#[test]
fn test_config_survives_json() {
    let mut config = ScenegraspConfig::new("scans");
    config.segmentation.seed = 7;
    config.clustering.max_cluster_size = Some(25_000);
    let json = serde_json::to_string(&config).unwrap();
    let parsed: ScenegraspConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, config);
}
