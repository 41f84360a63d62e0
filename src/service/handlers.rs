//! HTTP handlers and their request / response bodies

use crate::core::{ClassifierError, Species, FEATURE_NAMES};
use crate::service::state::{AppContext, ModelState};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

const DESCRIPTION: &str = "Ensemble model combining a Support Vector Machine tuned by \
cross-validated grid search with a Gradient Boosting classifier for iris flower classification";

/// Error body returned to clients
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl From<ClassifierError> for ApiError {
    fn from(err: ClassifierError) -> Self {
        let status = match err {
            ClassifierError::InvalidInput(_) | ClassifierError::DimensionMismatch { .. } => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            detail: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!("Rejected request ({}): {}", self.status.as_u16(), self.detail);
        (self.status, Json(ErrorResponse { detail: self.detail })).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

/// Body of POST /predict, measurements in centimeters
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PredictRequest {
    pub sepal_length: f64,
    pub sepal_width: f64,
    pub petal_length: f64,
    pub petal_width: f64,
}

impl PredictRequest {
    fn named(&self) -> [(&'static str, f64); 4] {
        [
            ("sepal_length", self.sepal_length),
            ("sepal_width", self.sepal_width),
            ("petal_length", self.petal_length),
            ("petal_width", self.petal_width),
        ]
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predicted_species: Species,
    pub confidence: f64,
    pub probabilities: BTreeMap<String, f64>,
    pub feature_names: Vec<String>,
    pub model_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub model_type: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub detail: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelInfoResponse {
    pub model_type: String,
    pub iris_species: Vec<Species>,
    pub features: Vec<String>,
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
    pub docs: String,
    pub health: String,
    pub model_info: String,
    pub predict: String,
}

fn feature_names() -> Vec<String> {
    FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
}

/// GET /health
pub async fn health(State(ctx): State<Arc<AppContext>>) -> Json<HealthResponse> {
    debug!("GET /health");
    let (status, detail) = match ctx.state() {
        ModelState::Ready(_) => ("healthy", None),
        ModelState::Failed(reason) => ("unhealthy", Some(reason.clone())),
    };
    Json(HealthResponse {
        status: status.to_string(),
        model_loaded: ctx.is_ready(),
        model_type: ctx.model_type(),
        detail,
    })
}

/// GET /model-info
pub async fn model_info(State(ctx): State<Arc<AppContext>>) -> Json<ModelInfoResponse> {
    debug!("GET /model-info");
    Json(ModelInfoResponse {
        model_type: ctx.model_type(),
        iris_species: Species::ALL.to_vec(),
        features: feature_names(),
        description: DESCRIPTION.to_string(),
    })
}

/// POST /predict
pub async fn predict(
    State(ctx): State<Arc<AppContext>>,
    body: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let Json(request) = body?;
    debug!("POST /predict {request:?}");

    let settings = ctx.settings();
    let features = request
        .named()
        .iter()
        .map(|&(name, value)| settings.check(name, value))
        .collect::<Result<Vec<f64>, ClassifierError>>()?;

    let (species, prediction) = ctx.predict(&features)?;
    let probabilities = Species::ALL
        .iter()
        .zip(&prediction.probabilities)
        .map(|(s, &p)| (s.name().to_string(), p))
        .collect();

    Ok(Json(PredictResponse {
        predicted_species: species,
        confidence: prediction.confidence(),
        probabilities,
        feature_names: feature_names(),
        model_type: ctx.model_type(),
    }))
}

/// GET /
pub async fn root() -> Json<RootResponse> {
    debug!("GET /");
    Json(RootResponse {
        message: format!("Iris Flower Classifier API v{}", crate::VERSION),
        docs: "/model-info".to_string(),
        health: "/health".to_string(),
        model_info: "/model-info".to_string(),
        predict: "/predict".to_string(),
    })
}

/// Unknown routes
pub async fn not_found() -> ApiError {
    ApiError {
        status: StatusCode::NOT_FOUND,
        detail: "Not Found".to_string(),
    }
}
