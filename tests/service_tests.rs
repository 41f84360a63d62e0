//! HTTP tests for the prediction service
//!
//! The router is driven in-process with `tower::ServiceExt::oneshot`.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use irisvm::persistence::{save_classifier, save_scaler};
use irisvm::service::{self, AppContext, ArtifactPaths, LoadedModel, ServiceSettings};
use irisvm::trainer::FittedPipeline;
use irisvm::{Trainer, TrainerConfig};
use serde_json::{json, Value};
use std::sync::{Arc, OnceLock};
use tempfile::TempDir;
use tower::ServiceExt;

fn fitted() -> &'static FittedPipeline {
    static FITTED: OnceLock<FittedPipeline> = OnceLock::new();
    FITTED.get_or_init(|| {
        Trainer::new(TrainerConfig::default())
            .fit()
            .expect("Training on the bundled iris data should succeed")
    })
}

fn ready_app() -> Router {
    let fitted = fitted();
    let model = LoadedModel::new(fitted.scaler.clone(), fitted.model.clone()).unwrap();
    service::router(Arc::new(AppContext::ready(model, ServiceSettings::default())))
}

fn failed_app() -> Router {
    service::router(Arc::new(AppContext::failed(
        "model.json not found",
        ServiceSettings::default(),
    )))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("Router should respond");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn post_json(app: Router, body: Value) -> (StatusCode, Value) {
    let request = Request::post("/predict")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

#[tokio::test]
async fn test_health_when_ready() {
    let (status, body) = get(ready_app(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model_loaded"], true);
    assert_eq!(body["model_type"], "Ensemble (SVM + Gradient Boosting)");
    assert!(body.get("detail").is_none());
}

#[tokio::test]
async fn test_health_with_missing_artifacts() {
    let dir = TempDir::new().unwrap();
    let ctx = AppContext::load(&ArtifactPaths::in_dir(dir.path()), ServiceSettings::default());
    let (status, body) = get(service::router(Arc::new(ctx)), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["model_loaded"], false);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_health_after_loading_artifacts() {
    let dir = TempDir::new().unwrap();
    let fitted = fitted();
    let paths = ArtifactPaths::in_dir(dir.path());
    save_scaler(&fitted.scaler, &paths.scaler).unwrap();
    save_classifier(&fitted.model, &fitted.params, &paths.model).unwrap();

    let ctx = AppContext::load(&paths, ServiceSettings::default());
    assert!(ctx.is_ready());
    let (_, body) = get(service::router(Arc::new(ctx)), "/health").await;
    assert_eq!(body["model_loaded"], true);
}

#[tokio::test]
async fn test_predict_setosa() {
    let (status, body) = post_json(
        ready_app(),
        json!({"sepal_length": 5.1, "sepal_width": 3.5, "petal_length": 1.4, "petal_width": 0.2}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["predicted_species"], "setosa");
    assert!(body["confidence"].as_f64().unwrap() >= 0.9);
    assert_eq!(body["model_type"], "Ensemble (SVM + Gradient Boosting)");
    assert_eq!(
        body["feature_names"],
        json!(["sepal length (cm)", "sepal width (cm)", "petal length (cm)", "petal width (cm)"])
    );

    let probabilities = body["probabilities"].as_object().unwrap();
    assert_eq!(probabilities.len(), 3);
    let total: f64 = probabilities.values().map(|p| p.as_f64().unwrap()).sum();
    assert!((total - 1.0).abs() < 1e-6);
    let best = probabilities
        .iter()
        .max_by(|a, b| a.1.as_f64().unwrap().total_cmp(&b.1.as_f64().unwrap()))
        .map(|(name, _)| name.clone())
        .unwrap();
    assert_eq!(best, "setosa");
}

#[tokio::test]
async fn test_predict_other_species() {
    let (_, body) = post_json(
        ready_app(),
        json!({"sepal_length": 7.0, "sepal_width": 3.2, "petal_length": 4.7, "petal_width": 1.4}),
    )
    .await;
    assert_eq!(body["predicted_species"], "versicolor");

    let (_, body) = post_json(
        ready_app(),
        json!({"sepal_length": 6.5, "sepal_width": 3.0, "petal_length": 5.8, "petal_width": 2.2}),
    )
    .await;
    assert_eq!(body["predicted_species"], "virginica");
}

#[tokio::test]
async fn test_predict_is_deterministic() {
    let input = json!({"sepal_length": 6.0, "sepal_width": 2.7, "petal_length": 5.1, "petal_width": 1.6});
    let (_, first) = post_json(ready_app(), input.clone()).await;
    let (_, second) = post_json(ready_app(), input).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_predict_missing_field() {
    let (status, body) = post_json(
        ready_app(),
        json!({"sepal_length": 5.1, "sepal_width": 3.5, "petal_length": 1.4}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("petal_width"));
}

#[tokio::test]
async fn test_predict_non_numeric_field() {
    let (status, body) = post_json(
        ready_app(),
        json!({"sepal_length": "long", "sepal_width": 3.5, "petal_length": 1.4, "petal_width": 0.2}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_predict_out_of_range() {
    for bad in [0.0, -1.0, 25.0] {
        let (status, body) = post_json(
            ready_app(),
            json!({"sepal_length": 5.1, "sepal_width": 3.5, "petal_length": bad, "petal_width": 0.2}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "value {bad}");
        assert!(body["detail"].as_str().unwrap().contains("petal_length"));
    }
}

#[tokio::test]
async fn test_predict_rejects_non_json() {
    let request = Request::post("/predict")
        .header("content-type", "text/plain")
        .body(Body::from("5.1,3.5,1.4,0.2"))
        .unwrap();
    let (status, body) = send(ready_app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());

    let request = Request::post("/predict")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = send(ready_app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_predict_without_model() {
    let (status, body) = post_json(
        failed_app(),
        json!({"sepal_length": 5.1, "sepal_width": 3.5, "petal_length": 1.4, "petal_width": 0.2}),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"].as_str().unwrap().contains("model.json not found"));

    // Validation still runs first
    let (status, _) = post_json(failed_app(), json!({"sepal_length": 5.1})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_model_info() {
    let (status, body) = get(failed_app(), "/model-info").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model_type"], "Ensemble (SVM + Gradient Boosting)");
    assert_eq!(body["iris_species"], json!(["setosa", "versicolor", "virginica"]));
    assert_eq!(body["features"].as_array().unwrap().len(), 4);
    assert!(body["description"].is_string());
}

#[tokio::test]
async fn test_root_links() {
    let (status, body) = get(failed_app(), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["health"], "/health");
    assert_eq!(body["model_info"], "/model-info");
    assert_eq!(body["predict"], "/predict");
    assert!(body["message"].as_str().unwrap().contains("Iris"));
}

#[tokio::test]
async fn test_unknown_route() {
    let (status, body) = get(failed_app(), "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Not Found");
}

#[tokio::test]
async fn test_custom_feature_bounds() {
    let fitted = fitted();
    let model = LoadedModel::new(fitted.scaler.clone(), fitted.model.clone()).unwrap();
    let settings = ServiceSettings {
        min_feature: 0.0,
        max_feature: 5.0,
    };
    let app = service::router(Arc::new(AppContext::ready(model, settings)));

    let (status, _) = post_json(
        app,
        json!({"sepal_length": 7.0, "sepal_width": 3.2, "petal_length": 4.7, "petal_width": 1.4}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
