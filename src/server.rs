use axum::{
    Form, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::{get, post},
};
use metrics::counter;
use serde::Deserialize;
use std::any::Any;
use std::path::Path;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::encoding::{EncodeError, FeatureEncoder};
use crate::engine::Engine;
use crate::interpret::{Assessment, interpret};
use crate::pages;
use crate::pipeline::PredictionPipeline;
use crate::types::{
    ErrorResponse, FEATURE_COUNT, FeatureVector, FormSubmission, HealthResponse, Prediction,
    PredictionResponse,
};

/// User-facing reasons a submission did not produce a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    MissingFields,
    ModelUnavailable,
    PredictionFailed,
    UnknownLabel,
}

impl Notice {
    pub const ALL: [Notice; 4] = [
        Notice::MissingFields,
        Notice::ModelUnavailable,
        Notice::PredictionFailed,
        Notice::UnknownLabel,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingFields => "missing_fields",
            Self::ModelUnavailable => "model_unavailable",
            Self::PredictionFailed => "prediction_failed",
            Self::UnknownLabel => "unknown_label",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::MissingFields => "Please fill in all fields",
            Self::ModelUnavailable => "Model not loaded. Please check the model file.",
            Self::PredictionFailed => "An error occurred during prediction. Please try again.",
            Self::UnknownLabel => "One of the selected values is not recognised.",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|n| n.code() == code)
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::MissingFields | Self::UnknownLabel => StatusCode::UNPROCESSABLE_ENTITY,
            Self::ModelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::PredictionFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn redirect(&self) -> Redirect {
        Redirect::to(&format!("/predict?notice={}", self.code()))
    }
}

/// Everything a successful submission renders.
#[derive(Debug, Clone)]
pub struct Outcome {
    /// Submitted labels, trimmed, in feature order.
    pub labels: [String; FEATURE_COUNT],
    pub model: String,
    pub features: FeatureVector,
    pub prediction: Prediction,
    pub assessment: Assessment,
}

/// Shared, read-only service state built once at start-up. `engine` is
/// `None` when the model could not be loaded.
#[derive(Clone)]
pub struct AppState {
    engine: Option<Arc<dyn Engine>>,
    encoders: Arc<FeatureEncoder>,
}

impl AppState {
    pub fn new(engine: Arc<dyn Engine>, encoders: FeatureEncoder) -> Self {
        Self {
            engine: Some(engine),
            encoders: Arc::new(encoders),
        }
    }

    /// Degraded state: every prediction is refused.
    pub fn unavailable() -> Self {
        Self {
            engine: None,
            encoders: Arc::new(FeatureEncoder::builtin()),
        }
    }

    /// Never fails; a load error is logged and yields the degraded state.
    pub fn load(model_dir: &Path) -> Self {
        match PredictionPipeline::load(model_dir) {
            Ok(pipeline) => {
                let encoders = pipeline.encoders().clone();
                Self::new(Arc::new(pipeline), encoders)
            }
            Err(e) => {
                tracing::error!(
                    model_dir = %model_dir.display(),
                    "Error loading model: {e}; predictions are disabled"
                );
                Self::unavailable()
            }
        }
    }

    pub fn model_loaded(&self) -> bool {
        self.engine.is_some()
    }

    /// Encode, predict and interpret one submission. An incomplete form is
    /// refused before the model is consulted.
    pub fn assess(&self, submission: &FormSubmission) -> Result<Outcome, Notice> {
        let encoded = self.encoders.encode_row(submission);
        if let Err(EncodeError::MissingField(column)) = &encoded {
            tracing::info!(column = %column, "Submission is missing required fields");
            return Err(Notice::MissingFields);
        }

        let Some(engine) = &self.engine else {
            tracing::warn!("Prediction requested but no model is loaded");
            return Err(Notice::ModelUnavailable);
        };

        let features = encoded.map_err(|e| {
            tracing::warn!(error = %e, "Rejected submission");
            match e {
                EncodeError::MissingField(_) => Notice::MissingFields,
                EncodeError::UnknownLabel { .. } => Notice::UnknownLabel,
                EncodeError::MissingColumn(_) => Notice::PredictionFailed,
            }
        })?;

        let prediction = engine.predict(&features).map_err(|e| {
            tracing::error!(?features, "Error during prediction: {e:#}");
            Notice::PredictionFailed
        })?;
        let assessment = interpret(&prediction);

        Ok(Outcome {
            labels: submission
                .fields()
                .map(|field| field.unwrap_or_default().to_string()),
            model: engine.model_name().to_string(),
            features,
            prediction,
            assessment,
        })
    }
}

fn record_outcome(result: &Result<Outcome, Notice>) {
    match result {
        Ok(outcome) => {
            counter!("predictions_total", "status" => outcome.assessment.status_class.as_str())
                .increment(1);
        }
        Err(notice) => {
            counter!("prediction_failures_total", "reason" => notice.code()).increment(1);
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home_handler))
        .route("/predict", get(predict_page_handler))
        .route("/about", get(about_handler))
        .route("/contact", get(contact_handler))
        .route("/submit", get(submit_get_handler).post(submit_handler))
        .route("/api/predict", post(api_predict_handler))
        .route("/health", get(health_handler))
        .fallback(not_found_handler)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn home_handler() -> Html<String> {
    Html(pages::home())
}

async fn about_handler() -> Html<String> {
    Html(pages::about())
}

async fn contact_handler() -> Html<String> {
    Html(pages::contact())
}

async fn not_found_handler() -> (StatusCode, Html<String>) {
    (StatusCode::NOT_FOUND, Html(pages::not_found()))
}

fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic");
    tracing::error!(detail, "Request handler panicked");
    counter!("handler_panics_total").increment(1);
    (StatusCode::INTERNAL_SERVER_ERROR, Html(pages::server_error())).into_response()
}

#[derive(Debug, Deserialize)]
struct NoticeQuery {
    notice: Option<String>,
}

async fn predict_page_handler(Query(query): Query<NoticeQuery>) -> Html<String> {
    let notice = query.notice.as_deref().and_then(Notice::from_code);
    Html(pages::predict_form(notice))
}

async fn submit_get_handler() -> Redirect {
    Redirect::to("/predict")
}

#[tracing::instrument(skip(state, form))]
async fn submit_handler(State(state): State<AppState>, Form(form): Form<FormSubmission>) -> Response {
    counter!("prediction_requests_total").increment(1);

    let result = state.assess(&form);
    record_outcome(&result);
    match result {
        Ok(outcome) => {
            tracing::info!(
                status = outcome.assessment.status_class.as_str(),
                confidence = outcome.assessment.confidence,
                "Prediction completed"
            );
            Html(pages::result(&outcome)).into_response()
        }
        Err(notice) => notice.redirect().into_response(),
    }
}

fn error_response(notice: Notice) -> Response {
    let body = ErrorResponse {
        error: notice.code().to_string(),
        message: notice.message().to_string(),
    };
    (notice.status(), Json(body)).into_response()
}

#[tracing::instrument(skip(state, request))]
async fn api_predict_handler(
    State(state): State<AppState>,
    Json(request): Json<FormSubmission>,
) -> Response {
    counter!("prediction_requests_total").increment(1);

    let result = state.assess(&request);
    record_outcome(&result);
    match result {
        Ok(outcome) => Json(PredictionResponse {
            id: format!("predict-{}", uuid::Uuid::new_v4().simple()),
            object: "prediction".to_string(),
            created: chrono::Utc::now().timestamp(),
            model: outcome.model,
            features: outcome.features,
            prediction: outcome.prediction.class,
            probabilities: outcome.prediction.probabilities,
            assessment: outcome.assessment,
        })
        .into_response(),
        Err(notice) => error_response(notice),
    }
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let model_loaded = state.model_loaded();
    Json(HealthResponse {
        status: if model_loaded { "ok" } else { "degraded" },
        model_loaded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notice_codes_round_trip() {
        for notice in Notice::ALL {
            assert_eq!(Notice::from_code(notice.code()), Some(notice));
        }
        assert_eq!(Notice::from_code("bogus"), None);
    }

    fn dog_with_fever() -> FormSubmission {
        FormSubmission {
            animal_name: Some("Dogs".into()),
            blood_brain_disease: Some("normal".into()),
            appearance_disease: Some("normal".into()),
            general_disease: Some("fever".into()),
            lung_disease: Some("normal".into()),
            abdominal_disease: Some("normal".into()),
        }
    }

    struct Healthy;

    impl Engine for Healthy {
        fn model_name(&self) -> &str {
            "Healthy"
        }

        fn predict(&self, _features: &FeatureVector) -> anyhow::Result<Prediction> {
            Ok(Prediction {
                class: 1,
                probabilities: vec![0.25, 0.75],
            })
        }
    }

    #[test]
    fn unavailable_state_refuses_predictions() {
        let state = AppState::unavailable();
        assert!(!state.model_loaded());
        assert_eq!(state.assess(&dog_with_fever()).unwrap_err(), Notice::ModelUnavailable);
    }

    #[test]
    fn missing_field_is_reported_before_model_state() {
        let submission = FormSubmission {
            abdominal_disease: Some(" ".into()),
            ..dog_with_fever()
        };
        let degraded = AppState::unavailable();
        assert_eq!(degraded.assess(&submission).unwrap_err(), Notice::MissingFields);

        let loaded = AppState::new(Arc::new(Healthy), FeatureEncoder::builtin());
        assert_eq!(loaded.assess(&submission).unwrap_err(), Notice::MissingFields);
    }

    #[test]
    fn assessment_keeps_trimmed_labels() {
        let submission = FormSubmission {
            animal_name: Some("  Dogs".into()),
            ..dog_with_fever()
        };
        let state = AppState::new(Arc::new(Healthy), FeatureEncoder::builtin());
        let outcome = state.assess(&submission).unwrap();
        assert_eq!(outcome.labels, ["Dogs", "normal", "normal", "fever", "normal", "normal"]);
        assert_eq!(outcome.features, FeatureVector([2, 0, 0, 9, 0, 0]));
        assert_eq!(outcome.model, "Healthy");
    }

    #[test]
    fn missing_model_dir_degrades() {
        let dir = std::env::temp_dir().join(format!("animal-health-none-{}", uuid::Uuid::new_v4()));
        assert!(!AppState::load(&dir).model_loaded());
    }
}
