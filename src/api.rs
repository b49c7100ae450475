//! REST API for the loading service.
//!
//! Exposes the optimizer over HTTP with Axum. Requests are validated before
//! any packing starts; packing itself runs on the blocking thread pool.

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
use serde_json::json;
use std::sync::OnceLock;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use utoipa::{OpenApi, ToSchema};

use crate::config::{ApiConfig, OptimizerConfig};
use crate::error::PackError;
use crate::model::{Container, Item, Shape, validate_items};
use crate::optimizer::{
    Optimizer, PackEvent, PackingConfig, PackingResult, Strategy, StrategySummary,
};
use crate::orientation::{CuboidOrientation, CylinderOrientation, Orientation};
use crate::search::PlacementTag;

#[derive(Clone)]
struct ApiState {
    packing: PackingConfig,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>roll_pack API Docs</title>
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

/// Request body of the packing endpoints.
///
/// Without `strategy` every ordering strategy is evaluated and the best run
/// is returned.
#[derive(Debug, Deserialize, Clone, ToSchema)]
#[schema(
    example = json!({
        "container": {
            "length": 100.0,
            "width": 80.0,
            "height": 170.0,
            "max_weight": 300.0,
            "shelf_interval": 20.0
        },
        "items": [
            {
                "id": "BOX001",
                "shape": {"kind": "cuboid", "length": 40.0, "width": 30.0, "height": 25.0, "orientations": ["B", "O"]},
                "weight": 10.5
            },
            {
                "id": "CYL001",
                "shape": {"kind": "cylinder", "diameter": 20.0, "height": 35.0, "orientations": ["B", "M"]},
                "weight": 4.5,
                "fragile": true
            }
        ]
    })
)]
pub struct PackRequest {
    pub container: Container,
    pub items: Vec<Item>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub strategy: Option<Strategy>,
}

impl PackRequest {
    fn validate(&self) -> Result<(), PackError> {
        self.container.validate()?;
        validate_items(&self.items)
    }
}

/// Result of a packing request.
#[derive(Serialize, ToSchema)]
pub struct PackResponse {
    pub strategy: Strategy,
    /// Placed items in loading order
    pub placed: Vec<PackedItem>,
    /// Ids of the items that did not fit
    pub unpacked: Vec<String>,
    pub total_weight: f64,
    /// Volume utilization in percent
    pub utilization: f64,
    pub is_complete: bool,
    /// One entry per evaluated strategy
    pub strategies: Vec<StrategySummary>,
}

/// Single placed item in the response.
///
/// # Fields
/// * `sequence` - Loading step (1-based)
/// * `pos` - Lower corner (x, y, z) in the container
/// * `dims` - Oriented extents (length, width, height)
/// * `tag` - Floor, shelf or stacked
#[derive(Serialize, ToSchema)]
pub struct PackedItem {
    pub sequence: usize,
    pub id: String,
    pub name: Option<String>,
    pub orientation: Orientation,
    pub tag: PlacementTag,
    #[schema(value_type = [f64; 3], example = json!([0.0, 0.0, 0.0]))]
    pub pos: (f64, f64, f64),
    #[schema(value_type = [f64; 3], example = json!([40.0, 30.0, 25.0]))]
    pub dims: (f64, f64, f64),
    pub weight: f64,
    pub fragile: bool,
}

impl PackResponse {
    pub fn from_packing_result(result: &PackingResult) -> Self {
        let placed = result
            .events()
            .iter()
            .zip(result.placed())
            .map(|(event, placed)| PackedItem {
                sequence: event.sequence,
                id: placed.item.id.clone(),
                name: placed.item.name.clone(),
                orientation: placed.orientation,
                tag: event.tag,
                pos: placed.position.as_tuple(),
                dims: placed.dims.as_tuple(),
                weight: placed.item.weight,
                fragile: placed.item.fragile,
            })
            .collect();

        Self {
            strategy: result.strategy(),
            placed,
            unpacked: result
                .unpacked_ids()
                .into_iter()
                .map(str::to_string)
                .collect(),
            total_weight: result.total_weight(),
            utilization: result.utilization(),
            is_complete: result.is_complete(),
            strategies: result.summaries().to_vec(),
        }
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

#[derive(Serialize, ToSchema)]
struct HealthResponse {
    status: String,
    version: String,
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

fn pack_error_response(err: &PackError) -> Response {
    let error = match err {
        PackError::InvalidContainer(_) => "Invalid container configuration",
        PackError::InvalidItem { .. } | PackError::DuplicateItemId(_) => "Invalid input data",
        PackError::Cancelled | PackError::Timeout(_) => "Packing interrupted",
    };
    error_response(StatusCode::UNPROCESSABLE_ENTITY, error, err.to_string())
}

fn parse_pack_request(
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> Result<PackRequest, Response> {
    let Json(payload) = payload.map_err(json_deserialize_error)?;
    payload
        .validate()
        .map_err(|err| pack_error_response(&err))?;
    Ok(payload)
}

#[derive(OpenApi)]
#[openapi(
    paths(handle_pack, handle_pack_stream, handle_health),
    components(
        schemas(
            PackRequest,
            PackResponse,
            PackedItem,
            ErrorResponse,
            HealthResponse,
            Container,
            Item,
            Shape,
            CuboidOrientation,
            CylinderOrientation,
            Orientation,
            Strategy,
            StrategySummary,
            PlacementTag,
            PackEvent
        )
    ),
    tags((name = "packing", description = "Endpoints for roll-container loading"))
)]
struct ApiDoc;

fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/pack", post(handle_pack))
        .route("/pack_stream", post(handle_pack_stream))
        .route("/health", get(handle_health))
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .with_state(state)
}

/// Starts the API server and blocks until it terminates.
pub async fn start_api_server(
    config: ApiConfig,
    optimizer_config: OptimizerConfig,
) -> std::io::Result<()> {
    let state = ApiState {
        packing: optimizer_config.packing_config(),
    };

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(
        "Server running on http://{}:{}",
        config.display_host(),
        config.port()
    );
    if config.binds_to_all_interfaces() {
        info!("Local access: http://localhost:{}", config.port());
    }
    info!("Endpoints: POST /pack, POST /pack_stream, GET /health, GET /docs");

    axum::serve(listener, router(state)).await
}

/// Handler for POST /pack.
///
/// Packs the items into the container and returns the placements in loading
/// order.
#[utoipa::path(
    post,
    path = "/pack",
    request_body = PackRequest,
    responses(
        (status = 200, description = "Packing computed", body = PackResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request, container or items",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_pack(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> Response {
    let request = match parse_pack_request(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    info!(
        items = request.items.len(),
        strategy = ?request.strategy,
        "new pack request"
    );

    let packing = state.packing;
    let outcome = tokio::task::spawn_blocking(move || {
        let optimizer = Optimizer::new(packing);
        match request.strategy {
            Some(strategy) => {
                optimizer.pack_with_strategy(&request.container, &request.items, strategy)
            }
            None => optimizer.optimize(&request.container, &request.items),
        }
    })
    .await;

    match outcome {
        Ok(Ok(result)) => {
            info!(
                strategy = %result.strategy(),
                placed = result.placed_count(),
                unpacked = result.unpacked_ids().len(),
                "pack request finished"
            );
            (StatusCode::OK, Json(PackResponse::from_packing_result(&result))).into_response()
        }
        Ok(Err(err)) => {
            warn!(%err, "pack request failed");
            pack_error_response(&err)
        }
        Err(err) => {
            error!(%err, "packing task aborted");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Packing task failed",
                err.to_string(),
            )
        }
    }
}

/// Handler for POST /pack_stream (SSE).
///
/// Streams the strategy summaries and then the selected run step by step so
/// a front end can animate the loading sequence.
#[utoipa::path(
    post,
    path = "/pack_stream",
    request_body = PackRequest,
    responses(
        (
            status = 200,
            description = "Server-sent events, each carrying one JSON-encoded PackEvent",
            content_type = "text/event-stream",
            body = PackEvent
        ),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request, container or items",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_pack_stream(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> Response {
    let request = match parse_pack_request(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let (tx, rx) = mpsc::channel::<String>(32);
    let packing = state.packing;

    tokio::task::spawn_blocking(move || {
        let optimizer = Optimizer::new(packing);
        let outcome = optimizer.pack_with_progress(
            &request.container,
            &request.items,
            request.strategy,
            |evt| {
                if let Ok(json) = serde_json::to_string(evt) {
                    // A closed receiver only means the client went away.
                    let _ = tx.blocking_send(json);
                }
            },
        );
        if let Err(err) = outcome {
            warn!(%err, "streamed pack request failed");
            let payload = json!({ "type": "Error", "error": err.code(), "details": err.to_string() });
            let _ = tx.blocking_send(payload.to_string());
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

/// Handler for GET /health.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "packing"
)]
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn serve_openapi_json() -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui() -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orientation::CuboidOrientation;

    fn state() -> ApiState {
        ApiState {
            packing: PackingConfig::builder().parallel_strategies(false).build(),
        }
    }

    fn two_boxes() -> PackRequest {
        PackRequest {
            container: Container::standard(),
            items: vec![
                Item::cuboid("A", (60.0, 40.0, 20.0), vec![CuboidOrientation::Bottom], 10.0),
                Item::cuboid("B", (60.0, 40.0, 20.0), vec![CuboidOrientation::Bottom], 10.0),
            ],
            strategy: None,
        }
    }

    #[test]
    fn openapi_doc_lists_expected_paths() {
        let doc = openapi_doc();
        let paths = &doc.paths.paths;
        for path in ["/pack", "/pack_stream", "/health"] {
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
            "PackRequest",
            "PackResponse",
            "PackEvent",
            "ErrorResponse",
            "Item",
            "Strategy",
        ] {
            assert!(
                schemas.contains_key(name),
                "Expected schema '{}' is missing from OpenAPI spec",
                name
            );
        }
    }

    #[test]
    fn pack_request_parses_catalog_codes() {
        let json = r#"{
            "container": {"length": 100.0, "width": 80.0, "height": 170.0, "max_weight": 300.0, "shelf_interval": 20.0},
            "items": [
                {"id": "BOX", "shape": {"kind": "cuboid", "length": 40.0, "width": 30.0, "height": 25.0, "orientations": ["B", "V"]}, "weight": 10.5},
                {"id": "CYL", "shape": {"kind": "cylinder", "diameter": 20.0, "height": 35.0, "orientations": ["side"]}, "fragile": true}
            ],
            "strategy": "heavy_bottom"
        }"#;
        let request: PackRequest = serde_json::from_str(json).expect("Should parse valid JSON");
        assert_eq!(request.strategy, Some(Strategy::HeavyBottom));
        assert_eq!(request.items.len(), 2);
        assert!(request.items[1].fragile);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn pack_request_strategy_defaults_to_none() {
        let json = r#"{
            "container": {"length": 10.0, "width": 10.0, "height": 10.0, "max_weight": 5.0, "shelf_interval": 5.0},
            "items": []
        }"#;
        let request: PackRequest = serde_json::from_str(json).expect("Should parse valid JSON");
        assert_eq!(request.strategy, None);
    }

    #[test]
    fn validation_failures_map_to_unprocessable_entity() {
        let mut request = two_boxes();
        request.items[1].id = "A".to_string();
        let response = parse_pack_request(Ok(Json(request))).unwrap_err();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let mut request = two_boxes();
        request.container.shelf_interval = 0.0;
        let response = parse_pack_request(Ok(Json(request))).unwrap_err();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn response_lists_placements_in_loading_order() {
        let request = two_boxes();
        let result = Optimizer::new(state().packing)
            .optimize(&request.container, &request.items)
            .unwrap();
        let response = PackResponse::from_packing_result(&result);

        assert!(response.is_complete);
        assert!(response.unpacked.is_empty());
        assert_eq!(response.strategies.len(), Strategy::ALL.len());
        let sequences: Vec<usize> = response.placed.iter().map(|p| p.sequence).collect();
        assert_eq!(sequences, vec![1, 2]);
        assert!(response.placed.iter().all(|p| p.tag == PlacementTag::Floor));

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["strategy"], "volume_desc");
        assert_eq!(json["placed"][0]["pos"], json!([0.0, 0.0, 0.0]));
    }

    #[tokio::test]
    async fn pack_handler_returns_ok_for_valid_request() {
        let response = handle_pack(State(state()), Ok(Json(two_boxes()))).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn pack_handler_rejects_invalid_item() {
        let mut request = two_boxes();
        request.items[0] = Item::cuboid("A", (0.0, 40.0, 20.0), vec![CuboidOrientation::Bottom], 1.0);
        let response = handle_pack(State(state()), Ok(Json(request))).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn health_reports_version() {
        let Json(health) = handle_health().await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
    }
}
