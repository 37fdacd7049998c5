//! REST API for the allocation service.
//!
//! Exposes the allocation engine over HTTP with axum, including a server-sent
//! events variant for live progress and OpenAPI documentation.

use std::sync::{Arc, OnceLock};

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use utoipa::{OpenApi, ToSchema};

use crate::allocator::{
    AllocationConfig, AllocationEvent, AllocationResult, AllocationSummary, allocate,
    allocate_with_progress, validate_run,
};
use crate::capacity::CarrierFitResult;
use crate::config::ApiConfig;
use crate::fit::{FitStatus, LimitingFactor};
use crate::geometry::{Orientation, SkuAxis};
use crate::model::{CarrierConfig, LoadingConstraint, SkuRecord, ValidationError};
use crate::policy::AllocationMode;
use crate::stats::{CarrierStats, UnassignedSummary};

#[derive(Clone)]
struct ApiState {
    allocation: AllocationConfig,
    carriers: Arc<Vec<CarrierConfig>>,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>carrier-fit API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                window.ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                });
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Request body for the allocation endpoints.
///
/// `carriers` replaces the configured catalog for this request; threshold and mode
/// override the service defaults.
#[derive(Deserialize, Clone, ToSchema)]
#[schema(
    example = json!({
        "skus": [
            {
                "id": "SKU-0001",
                "length_mm": 100.0,
                "width_mm": 80.0,
                "height_mm": 60.0,
                "weight_kg": 1.0,
                "stock_qty": 500
            }
        ],
        "borderline_threshold_mm": 2.0,
        "mode": "best_fit"
    })
)]
pub struct AllocateRequest {
    pub skus: Vec<SkuRecord>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub carriers: Option<Vec<CarrierConfig>>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub borderline_threshold_mm: Option<f64>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub mode: Option<AllocationMode>,
}

#[derive(Debug)]
struct ValidatedAllocateRequest {
    skus: Vec<SkuRecord>,
    carriers: Vec<CarrierConfig>,
    config: AllocationConfig,
}

#[derive(Debug)]
enum AllocateRequestValidationError {
    MissingSkus,
    InvalidCarrier(ValidationError),
    InvalidInput(ValidationError),
}

impl AllocateRequest {
    fn into_validated(
        self,
        defaults: AllocationConfig,
        catalog: &[CarrierConfig],
    ) -> Result<ValidatedAllocateRequest, AllocateRequestValidationError> {
        if self.skus.is_empty() {
            return Err(AllocateRequestValidationError::MissingSkus);
        }

        let mut config = defaults;
        if let Some(threshold) = self.borderline_threshold_mm {
            config.borderline_threshold_mm = threshold;
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }

        let carriers = self.carriers.unwrap_or_else(|| catalog.to_vec());
        for carrier in &carriers {
            carrier
                .validate()
                .map_err(AllocateRequestValidationError::InvalidCarrier)?;
        }

        validate_run(&self.skus, &carriers, &config)
            .map_err(AllocateRequestValidationError::InvalidInput)?;

        Ok(ValidatedAllocateRequest {
            skus: self.skus,
            carriers,
            config,
        })
    }
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid JSON data",
        err.to_string(),
    )
}

fn validation_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid input data",
        details,
    )
}

fn carrier_config_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid carrier configuration",
        details,
    )
}

fn parse_allocate_request(
    payload: Result<Json<AllocateRequest>, JsonRejection>,
    state: &ApiState,
) -> Result<ValidatedAllocateRequest, Response> {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(err) => return Err(json_deserialize_error(err)),
    };

    match payload.into_validated(state.allocation, &state.carriers) {
        Ok(validated) => Ok(validated),
        Err(AllocateRequestValidationError::MissingSkus) => {
            Err(validation_error("At least one SKU must be specified"))
        }
        Err(AllocateRequestValidationError::InvalidCarrier(err)) => {
            Err(carrier_config_error(err.to_string()))
        }
        Err(AllocateRequestValidationError::InvalidInput(err)) => {
            Err(validation_error(err.to_string()))
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(handle_allocate, handle_allocate_stream, handle_carriers),
    components(
        schemas(
            AllocateRequest,
            AllocationResult,
            AllocationSummary,
            AllocationEvent,
            AllocationMode,
            CarrierFitResult,
            CarrierStats,
            UnassignedSummary,
            CarrierConfig,
            LoadingConstraint,
            SkuRecord,
            FitStatus,
            LimitingFactor,
            Orientation,
            SkuAxis,
            ErrorResponse
        )
    ),
    tags((name = "allocation", description = "SKU to carrier fit and location allocation"))
)]
struct ApiDoc;

/// Builds the router with all routes and CORS.
fn router(allocation: AllocationConfig, carriers: Vec<CarrierConfig>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let state = ApiState {
        allocation,
        carriers: Arc::new(carriers),
    };

    Router::new()
        .route("/allocate", post(handle_allocate))
        .route("/allocate_stream", post(handle_allocate_stream))
        .route("/carriers", get(handle_carriers))
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .with_state(state)
}

/// Starts the API server.
///
/// Blocks until the server is terminated.
pub async fn start_api_server(
    config: ApiConfig,
    allocation: AllocationConfig,
    carriers: Vec<CarrierConfig>,
) {
    let carrier_count = carriers.len();
    let app = router(allocation, carriers);

    let addr = config.socket_addr();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("❌ Could not bind API server to {}: {}", addr, err);
            return;
        }
    };

    info!(
        "🚀 Server running on http://{}:{}",
        config.display_host(),
        config.port()
    );
    if config.binds_to_all_interfaces() {
        info!("💡 Local access: http://localhost:{}", config.port());
    }
    info!(
        mode = %allocation.mode,
        borderline_threshold_mm = allocation.borderline_threshold_mm,
        carriers = carrier_count,
        "📦 Endpoints: POST /allocate, POST /allocate_stream, GET /carriers, GET /docs"
    );

    if let Err(err) = axum::serve(listener, app).await {
        error!("❌ API server terminated with an error: {err}");
    }
}

/// Handler for POST /allocate.
///
/// Classifies every SKU against the carriers and returns assignments, carrier
/// statistics and outliers.
#[utoipa::path(
    post,
    path = "/allocate",
    request_body = AllocateRequest,
    responses(
        (status = 200, description = "Allocation computed", body = AllocationResult),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request or carrier configuration",
            body = ErrorResponse
        )
    ),
    tag = "allocation"
)]
async fn handle_allocate(
    State(state): State<ApiState>,
    payload: Result<Json<AllocateRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_allocate_request(payload, &state) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let ValidatedAllocateRequest {
        skus,
        carriers,
        config,
    } = request;
    info!(
        "📥 New allocation request: {} SKUs, {} carriers, mode {}",
        skus.len(),
        carriers.len(),
        config.mode
    );

    let outcome =
        tokio::task::spawn_blocking(move || allocate(&skus, &carriers, &config)).await;

    match outcome {
        Ok(Ok(result)) => {
            info!(
                "📦 Result: {} assigned, {} unassigned, {} outliers",
                result.summary.assigned_skus,
                result.summary.unassigned_skus,
                result.summary.outlier_count
            );
            (StatusCode::OK, Json(result)).into_response()
        }
        Ok(Err(err)) => validation_error(err.to_string()),
        Err(err) => {
            error!("❌ Allocation task failed: {err}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Allocation failed",
                err.to_string(),
            )
        }
    }
}

/// Handler for POST /allocate_stream (SSE).
///
/// Streams allocation events as server-sent events (text/event-stream).
#[utoipa::path(
    post,
    path = "/allocate_stream",
    request_body = AllocateRequest,
    responses(
        (
            status = 200,
            description = "Streams allocation events in real-time",
            content_type = "text/event-stream",
            body = String
        ),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request or carrier configuration",
            body = ErrorResponse
        )
    ),
    tag = "allocation"
)]
async fn handle_allocate_stream(
    State(state): State<ApiState>,
    payload: Result<Json<AllocateRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_allocate_request(payload, &state) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let ValidatedAllocateRequest {
        skus,
        carriers,
        config,
    } = request;

    let (tx, rx) = mpsc::channel::<String>(32);

    tokio::task::spawn_blocking(move || {
        let outcome = allocate_with_progress(&skus, &carriers, &config, |evt| {
            if let Ok(json) = serde_json::to_string(evt) {
                // A closed receiver only means the client went away.
                let _ = tx.blocking_send(json);
            }
        });
        if let Err(err) = outcome {
            warn!("⚠️ Streaming allocation rejected: {err}");
        }
    });

    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

/// Handler for GET /carriers: the configured carrier catalog.
#[utoipa::path(
    get,
    path = "/carriers",
    responses(
        (status = 200, description = "Configured carriers", body = [CarrierConfig])
    ),
    tag = "allocation"
)]
async fn handle_carriers(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.carriers.as_ref().clone())
}

async fn serve_openapi_json(State(_state): State<ApiState>) -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui(State(_state): State<ApiState>) -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_carriers;

    fn request(json: &str) -> AllocateRequest {
        serde_json::from_str(json).expect("Should parse valid JSON")
    }

    const ONE_SKU: &str = r#"{
        "skus": [{"id": "A", "length_mm": 100, "width_mm": 80, "height_mm": 60,
                  "weight_kg": 1, "stock_qty": 500}]
    }"#;

    #[test]
    fn openapi_doc_lists_expected_paths() {
        let doc = openapi_doc();
        let paths = &doc.paths.paths;
        for path in ["/allocate", "/allocate_stream", "/carriers"] {
            assert!(
                paths.contains_key(path),
                "OpenAPI documentation is missing the {} path",
                path
            );
        }
    }

    #[test]
    fn openapi_doc_contains_key_schemas() {
        let doc = openapi_doc();
        let components = doc
            .components
            .as_ref()
            .expect("OpenAPI documentation contains no components");
        let schemas = &components.schemas;
        for name in [
            "AllocateRequest",
            "AllocationResult",
            "CarrierFitResult",
            "CarrierStats",
            "ErrorResponse",
        ] {
            assert!(
                schemas.contains_key(name),
                "Expected schema '{}' is missing from the OpenAPI document",
                name
            );
        }
    }

    #[test]
    fn request_without_overrides_uses_defaults_and_catalog() {
        let validated = request(ONE_SKU)
            .into_validated(AllocationConfig::default(), &default_carriers())
            .expect("Should validate successfully");
        assert_eq!(validated.carriers.len(), 3);
        assert_eq!(validated.config, AllocationConfig::default());
    }

    #[test]
    fn request_overrides_threshold_and_mode() {
        let json = r#"{
            "skus": [{"id": "A", "length_mm": 100, "width_mm": 80, "height_mm": 60,
                      "weight_kg": 1}],
            "borderline_threshold_mm": 5.0,
            "mode": "prioritized",
            "carriers": [{"id": "T", "inner_length_mm": 570, "inner_width_mm": 370,
                          "inner_height_mm": 200, "max_weight_kg": 35, "priority": 1}]
        }"#;
        let validated = request(json)
            .into_validated(AllocationConfig::default(), &default_carriers())
            .expect("Should validate successfully");
        assert_eq!(validated.config.borderline_threshold_mm, 5.0);
        assert_eq!(validated.config.mode, AllocationMode::Prioritized);
        assert_eq!(validated.carriers.len(), 1);
        assert_eq!(validated.skus[0].stock_qty, 0);
    }

    #[test]
    fn empty_sku_list_is_rejected() {
        let result = request(r#"{"skus": []}"#)
            .into_validated(AllocationConfig::default(), &default_carriers());
        assert!(matches!(
            result,
            Err(AllocateRequestValidationError::MissingSkus)
        ));
    }

    #[test]
    fn invalid_carrier_and_threshold_are_rejected() {
        let json = r#"{
            "skus": [{"id": "A", "length_mm": 100, "width_mm": 80, "height_mm": 60,
                      "weight_kg": 1}],
            "carriers": [{"id": "T", "inner_length_mm": -1, "inner_width_mm": 370,
                          "inner_height_mm": 200, "max_weight_kg": 35}]
        }"#;
        assert!(matches!(
            request(json).into_validated(AllocationConfig::default(), &[]),
            Err(AllocateRequestValidationError::InvalidCarrier(_))
        ));

        let mut negative = request(ONE_SKU);
        negative.borderline_threshold_mm = Some(-1.0);
        assert!(matches!(
            negative.into_validated(AllocationConfig::default(), &default_carriers()),
            Err(AllocateRequestValidationError::InvalidInput(
                ValidationError::InvalidThreshold(_)
            ))
        ));
    }

    #[test]
    fn unknown_mode_fails_to_parse() {
        let json = r#"{"skus": [], "mode": "cheapest"}"#;
        assert!(serde_json::from_str::<AllocateRequest>(json).is_err());
    }
}
