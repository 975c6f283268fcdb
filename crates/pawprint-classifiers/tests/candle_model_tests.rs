//! Candle classifier integration tests
//!
//! These build real ResNet graphs from generated weights, so they exercise
//! the same path as a production model without downloading anything.

use bytes::Bytes;
use candle_core::{DType, Device};
use candle_nn::{VarBuilder, VarMap};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use pawprint_classifiers::{
    ArchitectureConfig, CandleImageClassifier, CandleModelLoader, ImageClassifier, ModelConfig,
    ModelLoader,
};
use pawprint_core::{ClassLabels, ANIMALS10};
use std::io::Cursor;

fn small_config(path: &str) -> ModelConfig {
    let mut config = ModelConfig::local(path, ArchitectureConfig::Resnet18);
    config.preprocessing.width = 64;
    config.preprocessing.height = 64;
    config
}

fn png(color: [u8; 3]) -> Bytes {
    let mut img = RgbImage::from_pixel(40, 30, Rgb(color));
    img.put_pixel(3, 4, Rgb([0, 255, 0]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    Bytes::from(buf.into_inner())
}

#[tokio::test]
async fn test_zero_weights_give_uniform_scores() {
    let config = small_config("unused.safetensors");
    let vb = VarBuilder::zeros(DType::F32, &Device::Cpu);
    let classifier = CandleImageClassifier::from_var_builder(&config, vb, Device::Cpu).unwrap();

    let result = classifier.classify(png([200, 100, 50])).await.unwrap();

    assert_eq!(result.scores.len(), 10);
    for score in &result.scores {
        assert!((score - 0.1).abs() < 1e-5, "expected uniform scores, got {:?}", result.scores);
    }
    assert_eq!(result.prediction.label, "butterfly");
    assert_eq!(result.prediction.confidence_percent(), 10.0);
}

#[tokio::test]
async fn test_saved_weights_roundtrip_through_loader() {
    let dir = tempfile::tempdir().unwrap();
    let weights = dir.path().join("animals10.safetensors");

    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
    candle_transformers::models::resnet::resnet18(10, vb).unwrap();
    varmap.save(&weights).unwrap();

    let loader = CandleModelLoader::new(small_config(weights.to_str().unwrap()));
    let classifier = loader.load().await.unwrap();
    assert_eq!(classifier.labels(), &ClassLabels::animals10());

    let image = png([12, 140, 220]);
    let first = classifier.classify(image.clone()).await.unwrap();
    let second = classifier.classify(image).await.unwrap();

    assert!(ANIMALS10.contains(&first.prediction.label.as_str()));
    let confidence = first.prediction.confidence_percent();
    assert!((0.0..=100.0).contains(&confidence));
    assert_eq!(first.prediction.label, second.prediction.label);
    assert_eq!(first.scores, second.scores);

    let total: f32 = first.scores.iter().sum();
    assert!((total - 1.0).abs() < 1e-4);
}

#[tokio::test]
async fn test_undecodable_upload_is_decode_error() {
    let config = small_config("unused.safetensors");
    let vb = VarBuilder::zeros(DType::F32, &Device::Cpu);
    let classifier = CandleImageClassifier::from_var_builder(&config, vb, Device::Cpu).unwrap();

    let err = classifier
        .classify(Bytes::from_static(b"GIF89a but not really"))
        .await
        .unwrap_err();
    assert!(matches!(err, pawprint_core::Error::Decode(_)));
}

#[tokio::test]
async fn test_label_count_sets_head_size() {
    let mut config = small_config("unused.safetensors");
    config.labels = ClassLabels::new(vec!["cat".into(), "dog".into(), "cow".into()]).unwrap();
    let vb = VarBuilder::zeros(DType::F32, &Device::Cpu);
    let classifier = CandleImageClassifier::from_var_builder(&config, vb, Device::Cpu).unwrap();

    let result = classifier.classify(png([1, 2, 3])).await.unwrap();
    assert_eq!(result.scores.len(), 3);
    assert_eq!(result.prediction.label, "cat");
}
