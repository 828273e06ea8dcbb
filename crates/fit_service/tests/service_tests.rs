//! Service behaviour over hand-built artifacts

use fitcheck_core::gbdt::{Ensemble, Node, Tree, SCALE};
use fitcheck_core::{FeatureEncoder, FitLabel, Measurement, ModelArtifact, TrainingSummary};
use fitcheck_service::{FitService, ServiceConfig, ServiceError};

fn corpus() -> Vec<Measurement> {
    [(60.0, 0, "dresses"), (78.0, 3, "bottoms"), (96.0, 6, "tops"), (84.0, 4, "outerwear")]
        .iter()
        .map(|&(waist, size, category)| {
            let mut m = Measurement {
                cup_size: "b".to_string(),
                bra_num: 34.0,
                hips: waist * 1.4,
                waist,
                category: category.to_string(),
                size,
                height_cm: 165.0,
                bmi_proxy: 0.0,
            };
            m.refresh_bmi_proxy();
            m
        })
        .collect()
}

/// Narrow waists score `below`, wide waists score `above`
fn artifact(below: FitLabel, above: FitLabel) -> ModelArtifact {
    let encoder = FeatureEncoder::fit(&corpus()).unwrap();
    let class_trees = FitLabel::ALL
        .iter()
        .map(|&label| {
            let low = if label == below { 2 * SCALE } else { 0 };
            let high = if label == above { 2 * SCALE } else { 0 };
            vec![Tree::new(vec![
                Node::internal(0, 2, 0, 1, 2),
                Node::leaf(1, low),
                Node::leaf(2, high),
            ])]
        })
        .collect();
    let ensemble = Ensemble::new(encoder.width(), vec![0, 0, 0], class_trees);
    ModelArtifact::new(
        encoder,
        ensemble,
        1,
        TrainingSummary {
            sample_count: 4,
            anchor_count: 0,
            seed: 42,
            trees_per_class: 1,
            max_depth: 1,
            learning_rate: 1.0,
        },
    )
}

fn config_in(dir: &std::path::Path) -> ServiceConfig {
    ServiceConfig {
        model_path: dir.join("fit_model.json"),
        ..ServiceConfig::default()
    }
}

#[test]
fn response_shape() {
    let service = FitService::from_artifact(
        ServiceConfig::default(),
        artifact(FitLabel::Fit, FitLabel::Small),
    );
    let response = service
        .predict_json(r#"{"height": 165, "waist": 90, "hips": 50, "size": 4, "category": "bottoms", "bra_num": 34, "cup_size": "B"}"#)
        .unwrap();

    assert_eq!(response.result, "Small");
    assert_eq!(response.label, FitLabel::Small);
    assert!((response.measurement.hips - 126.0).abs() < 1e-9);
    assert_eq!(response.measurement.cup_size, "b");
    assert!(response.image_url.contains("photo-1541099649105"));

    // e^2 / (e^2 + 2) for the winner, 1 / (e^2 + 2) for the others
    let e2 = 2f64.exp();
    let fit_pct = (1.0 / (e2 + 2.0) * 1000.0).round() / 10.0;
    assert_eq!(response.probs.fit, fit_pct);
    assert_eq!(response.confidence, format!("{:.1}%", 100.0 / (e2 + 2.0)));
    let total = response.probs.small + response.probs.fit + response.probs.large;
    assert!((total - 100.0).abs() <= 0.2);

    let json = serde_json::to_value(&response).unwrap();
    for key in ["result", "label", "confidence", "image_url", "probs", "measurement"] {
        assert!(json.get(key).is_some(), "missing {key}");
    }
    assert_eq!(json["label"], "small");
}

#[test]
fn lenient_fields_fall_back_to_defaults() {
    let service = FitService::from_artifact(
        ServiceConfig::default(),
        artifact(FitLabel::Fit, FitLabel::Small),
    );
    let response = service
        .predict_json(r#"{"height": "abc", "waist": null, "hips": -3, "size": "x", "category": "capes"}"#)
        .unwrap();

    let m = &response.measurement;
    assert_eq!(m.height_cm, 0.0);
    assert_eq!(m.waist, 0.0);
    assert_eq!(m.hips, 0.0);
    assert_eq!(m.size, 6);
    assert_eq!(m.cup_size, "b");
    assert_eq!(m.bmi_proxy, 0.0);
    assert_eq!(m.category, "capes");
    assert_eq!(response.image_url, "https://placehold.co/300x400?text=No+Image");
    assert_eq!(response.label, FitLabel::Fit);
}

#[test]
fn empty_object_uses_every_default() {
    let service = FitService::from_artifact(
        ServiceConfig::default(),
        artifact(FitLabel::Fit, FitLabel::Small),
    );
    let response = service.predict_json("{}").unwrap();
    assert_eq!(response.measurement.category, "dresses");
    assert_eq!(response.measurement.size, 6);
}

#[test]
fn both_field_spellings_are_accepted() {
    let service = FitService::from_artifact(
        ServiceConfig::default(),
        artifact(FitLabel::Fit, FitLabel::Small),
    );
    let response = service
        .predict_json(r#"{"height": 165, "height_cm": 170, "bra_num": 34, "bra_size": 36, "waist": 80}"#)
        .unwrap();
    assert_eq!(response.measurement.height_cm, 165.0);
    assert_eq!(response.measurement.bra_num, 34.0);

    let response = service
        .predict_json(r#"{"height_cm": 170, "bra_size": 36, "waist": 80}"#)
        .unwrap();
    assert_eq!(response.measurement.height_cm, 170.0);
    assert_eq!(response.measurement.bra_num, 36.0);
}

#[test]
fn malformed_body_is_bad_request() {
    let service = FitService::from_artifact(
        ServiceConfig::default(),
        artifact(FitLabel::Fit, FitLabel::Small),
    );
    for body in ["not json", "[1, 2]", "42"] {
        let err = service.predict_json(body).unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)), "{body}");
        assert_eq!(err.status_code(), 400);
    }
}

#[test]
fn missing_model_reports_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let service = FitService::new(config_in(dir.path()));

    assert!(!service.is_ready());
    assert!(!service.status().ready);
    let err = service.predict_json(r#"{"waist": 70}"#).unwrap_err();
    assert!(matches!(err, ServiceError::ModelUnavailable(_)));
    assert_eq!(err.status_code(), 503);
}

#[test]
fn reload_picks_up_new_model() {
    let dir = tempfile::tempdir().unwrap();
    let service = FitService::new(config_in(dir.path()));
    assert!(service.reload().is_err());

    artifact(FitLabel::Fit, FitLabel::Small)
        .save_to_dir(dir.path())
        .unwrap();
    service.reload().unwrap();
    assert!(service.is_ready());
    let first = service.predict_json(r#"{"waist": 100, "size": 3}"#).unwrap();
    assert_eq!(first.label, FitLabel::Small);

    let status = service.status();
    assert_eq!(status.rules_version, Some(1));
    assert_eq!(status.trees, Some(3));
    let recorded = std::fs::read_to_string(dir.path().join("fit_model.hash")).unwrap();
    assert_eq!(status.model_hash, Some(recorded));

    artifact(FitLabel::Large, FitLabel::Large)
        .save_to_dir(dir.path())
        .unwrap();
    service.reload().unwrap();
    let second = service.predict_json(r#"{"waist": 100, "size": 3}"#).unwrap();
    assert_eq!(second.label, FitLabel::Large);
}

#[test]
fn failed_reload_keeps_serving() {
    let dir = tempfile::tempdir().unwrap();
    artifact(FitLabel::Fit, FitLabel::Small)
        .save_to_dir(dir.path())
        .unwrap();
    let service = FitService::new(config_in(dir.path()));
    assert!(service.is_ready());

    std::fs::write(dir.path().join("fit_model.json"), "{\"broken\": true}").unwrap();
    assert!(service.reload().is_err());

    let response = service.predict_json(r#"{"waist": 62}"#).unwrap();
    assert_eq!(response.label, FitLabel::Fit);
}
