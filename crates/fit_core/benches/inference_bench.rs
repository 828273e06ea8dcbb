use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fitcheck_core::gbdt::{Ensemble, Node, Tree, SCALE};
use fitcheck_core::{
    FeatureEncoder, FitLabel, FitRequest, InferenceService, Measurement, ModelArtifact,
    TrainingSummary,
};
use std::sync::Arc;

fn sample_artifact() -> ModelArtifact {
    // Small synthetic artifact: 50 depth-2 trees per class over the waist and size columns.
    let rows: Vec<Measurement> = (0..19u32)
        .map(|size| {
            let waist = 60.0 + f64::from(size) * 6.0;
            Measurement {
                cup_size: "b".to_string(),
                bra_num: 34.0,
                hips: waist * 1.4,
                waist,
                category: "dresses".to_string(),
                size,
                height_cm: 165.0,
                bmi_proxy: waist / 165.0,
            }
        })
        .collect();
    let encoder = FeatureEncoder::fit(&rows).expect("encoder");

    let tree = |sign: i64| {
        Tree::new(vec![
            Node::internal(0, 2, 0, 1, 2),
            Node::internal(1, 3, -SCALE / 2, 3, 4),
            Node::leaf(2, sign * SCALE / 10),
            Node::leaf(3, -sign * SCALE / 20),
            Node::leaf(4, sign * SCALE / 20),
        ])
    };
    let class_trees = (0..FitLabel::COUNT)
        .map(|class| (0..50).map(|_| tree(class as i64 - 1)).collect())
        .collect();
    let ensemble = Ensemble::new(encoder.width(), vec![0; FitLabel::COUNT], class_trees);

    ModelArtifact::new(
        encoder,
        ensemble,
        1,
        TrainingSummary {
            sample_count: rows.len(),
            anchor_count: 0,
            seed: 0,
            trees_per_class: 50,
            max_depth: 2,
            learning_rate: 0.1,
        },
    )
}

fn bench_fit_prediction(c: &mut Criterion) {
    let service = InferenceService::new(Arc::new(sample_artifact()));
    let request = FitRequest {
        height: Some(165.0),
        waist: Some(78.0),
        size: Some(3),
        category: Some("bottoms".to_string()),
        ..FitRequest::default()
    };

    c.bench_function("fit_predict_request", |b| {
        b.iter(|| {
            let prediction = service.predict(black_box(&request));
            black_box(prediction.ok());
        });
    });
}

criterion_group!(fit_benches, bench_fit_prediction);
criterion_main!(fit_benches);
