//! JSON web service for barcode scanners and the stocktake screen
//!
//! Every request reloads the catalog and logs from disk, applies one change
//! and writes the affected file back. A single mutex around the session state
//! serializes those file round trips.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;

use crate::bulk::reconcile_upload;
use crate::codegen::{generate_frame_code, generate_unique_barcode};
use crate::error::InventoryError;
use crate::export::{render, ExportKind, ExportSources};
use crate::label::Label;
use crate::models::Product;
use crate::session::Session;
use crate::stocktake::{
    Reconciliation, ReconciliationSummary, ScanOutcome, ScanRow, UnfoundEntry,
};
use crate::config::Settings;
use crate::tabular::{read_table_bytes, TableFormat};

/// Shared application state
#[derive(Clone)]
struct AppState {
    settings: Arc<Settings>,
    session: Arc<Mutex<Session>>,
}

impl AppState {
    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// API response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

type ApiError = (StatusCode, Json<ApiResponse<()>>);
type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse {
        success: true,
        data: Some(data),
        error: None,
    }))
}

fn status_for(err: &InventoryError) -> StatusCode {
    match err {
        InventoryError::EmptyInput
        | InventoryError::MissingField(_)
        | InventoryError::MissingColumn(_)
        | InventoryError::BarcodeSymbol(..) => StatusCode::BAD_REQUEST,
        InventoryError::AlreadyScanned(_)
        | InventoryError::DuplicateBarcode(_)
        | InventoryError::DuplicateFrameCode(_)
        | InventoryError::NothingToConfirm(_)
        | InventoryError::BarcodeSpaceExhausted(_) => StatusCode::CONFLICT,
        InventoryError::NotInCatalog(_)
        | InventoryError::NotScanned(_)
        | InventoryError::ProductNotFound(_)
        | InventoryError::FileNotFound(_) => StatusCode::NOT_FOUND,
        InventoryError::UnsupportedFileType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<InventoryError> for (StatusCode, Json<ApiResponse<()>>) {
    fn from(err: InventoryError) -> Self {
        let status = status_for(&err);
        if err.is_user_error() {
            log::debug!("Request rejected: {}", err);
        } else {
            log::error!("Request failed: {}", err);
        }
        (
            status,
            Json(ApiResponse {
                success: false,
                data: None,
                error: Some(err.to_string()),
            }),
        )
    }
}

#[derive(Deserialize)]
struct BarcodeBody {
    barcode: String,
}

#[derive(Deserialize, Default)]
struct OptionalBarcodeBody {
    #[serde(default)]
    barcode: Option<String>,
}

#[derive(Deserialize)]
struct SupplierBody {
    supplier: String,
}

#[derive(Deserialize)]
struct FormatParams {
    #[serde(default = "default_format")]
    format: String,
}

fn default_format() -> String {
    "csv".to_string()
}

#[derive(Deserialize)]
struct UploadParams {
    #[serde(default = "default_format")]
    format: String,
    column: Option<String>,
}

/// Catalog listing
#[derive(Serialize)]
struct CatalogView {
    file: String,
    columns: Vec<String>,
    products: Vec<Product>,
}

/// Stocktake screen contents
#[derive(Serialize)]
struct StocktakeView {
    rows: Vec<ScanRow>,
    summary: ReconciliationSummary,
    session: Session,
}

#[derive(Serialize)]
struct GeneratedCode {
    code: String,
}

/// POST /save_barcode - lookup used by the handheld scanner page.
/// Answers `{"fields": {...}}` or `{"error": "..."}`.
async fn save_barcode_handler(
    State(state): State<AppState>,
    Json(body): Json<BarcodeBody>,
) -> Json<serde_json::Value> {
    let _guard = state.lock();
    match state.settings.load_catalog() {
        Ok((_, catalog)) => match catalog.find_by_barcode(&body.barcode) {
            Some(product) => Json(serde_json::json!({ "fields": product })),
            None => Json(serde_json::json!({ "error": "Barcode not found in inventory." })),
        },
        Err(e) => {
            log::error!("Lookup failed: {}", e);
            Json(serde_json::json!({ "error": e.to_string() }))
        }
    }
}

/// GET /api/catalog
async fn catalog_handler(State(state): State<AppState>) -> ApiResult<CatalogView> {
    let _guard = state.lock();
    let (path, catalog) = state.settings.load_catalog()?;
    ok(CatalogView {
        file: path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        columns: catalog.columns().to_vec(),
        products: catalog.products().to_vec(),
    })
}

/// GET /api/products/{barcode}
async fn product_handler(
    State(state): State<AppState>,
    Path(barcode): Path<String>,
) -> ApiResult<Product> {
    let _guard = state.lock();
    let (_, catalog) = state.settings.load_catalog()?;
    match catalog.find_by_barcode(&barcode) {
        Some(product) => ok(product.clone()),
        None => Err(InventoryError::ProductNotFound(barcode).into()),
    }
}

/// POST /api/products
async fn add_product_handler(
    State(state): State<AppState>,
    Json(input): Json<Product>,
) -> ApiResult<Product> {
    let _guard = state.lock();
    let (path, mut catalog) = state.settings.load_catalog()?;
    let idx = catalog.add_product(&input)?;
    catalog.save(&path)?;
    ok(catalog.products()[idx].clone())
}

/// PUT /api/products/{barcode}
async fn update_product_handler(
    State(state): State<AppState>,
    Path(barcode): Path<String>,
    Json(input): Json<Product>,
) -> ApiResult<Product> {
    let _guard = state.lock();
    let (path, mut catalog) = state.settings.load_catalog()?;
    let idx = catalog
        .position_of(&barcode)
        .ok_or_else(|| InventoryError::ProductNotFound(barcode.clone()))?;
    catalog.update_product(idx, &input)?;
    catalog.save(&path)?;
    ok(catalog.products()[idx].clone())
}

/// DELETE /api/products/{barcode} - first step, asks for confirmation
async fn request_delete_handler(
    State(state): State<AppState>,
    Path(barcode): Path<String>,
) -> ApiResult<Session> {
    let mut session = state.lock();
    let (_, catalog) = state.settings.load_catalog()?;
    let product = catalog
        .find_by_barcode(&barcode)
        .ok_or_else(|| InventoryError::ProductNotFound(barcode.clone()))?;
    session.request_delete(product.barcode());
    ok(session.clone())
}

/// POST /api/products/{barcode}/delete/confirm
async fn confirm_delete_handler(
    State(state): State<AppState>,
    Path(barcode): Path<String>,
) -> ApiResult<Product> {
    let mut session = state.lock();
    let (path, mut catalog) = state.settings.load_catalog()?;
    let idx = catalog
        .position_of(&barcode)
        .ok_or_else(|| InventoryError::ProductNotFound(barcode.clone()))?;
    let canonical = catalog.products()[idx].barcode().to_string();
    if !session.take_delete(&canonical) {
        return Err(InventoryError::NothingToConfirm(format!("delete {}", canonical)).into());
    }
    let removed = catalog.delete_product(idx)?;
    catalog.save(&path)?;
    ok(removed)
}

/// POST /api/generate/barcode
async fn generate_barcode_handler(State(state): State<AppState>) -> ApiResult<GeneratedCode> {
    let _guard = state.lock();
    let (_, catalog) = state.settings.load_catalog()?;
    let code = generate_unique_barcode(&catalog, &mut rand::thread_rng())?;
    ok(GeneratedCode { code })
}

/// POST /api/generate/framecode
async fn generate_framecode_handler(
    State(state): State<AppState>,
    Json(body): Json<SupplierBody>,
) -> ApiResult<GeneratedCode> {
    let _guard = state.lock();
    let (_, catalog) = state.settings.load_catalog()?;
    let code = generate_frame_code(&body.supplier, &catalog)?;
    ok(GeneratedCode { code })
}

/// GET /api/labels/{barcode}
async fn label_handler(
    State(state): State<AppState>,
    Path(barcode): Path<String>,
) -> ApiResult<Label> {
    let _guard = state.lock();
    let (_, catalog) = state.settings.load_catalog()?;
    let product = catalog
        .find_by_barcode(&barcode)
        .ok_or_else(|| InventoryError::ProductNotFound(barcode.clone()))?;
    ok(Label::for_product(product))
}

/// GET /api/labels/{barcode}/image - Code 128 bars as SVG
async fn label_image_handler(
    State(state): State<AppState>,
    Path(barcode): Path<String>,
) -> Result<Response, ApiError> {
    let _guard = state.lock();
    let (_, catalog) = state.settings.load_catalog()?;
    let product = catalog
        .find_by_barcode(&barcode)
        .ok_or_else(|| InventoryError::ProductNotFound(barcode.clone()))?;
    let svg = Label::for_product(product).barcode_svg()?;
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response())
}

/// GET /api/stocktake
async fn stocktake_handler(State(state): State<AppState>) -> ApiResult<StocktakeView> {
    let session = state.lock();
    let (_, stocktake) = state.settings.open_stocktake()?;
    ok(StocktakeView {
        rows: stocktake.rows(),
        summary: stocktake.reconcile().summary(),
        session: session.clone(),
    })
}

/// POST /api/stocktake/scan
async fn scan_handler(
    State(state): State<AppState>,
    Json(body): Json<BarcodeBody>,
) -> ApiResult<ScanOutcome> {
    let mut session = state.lock();
    let (_, mut stocktake) = state.settings.open_stocktake()?;
    match stocktake.record(&body.barcode) {
        Ok(outcome) => {
            session.set_last_unfound(None);
            if outcome.was_added() {
                log::info!("Scan {} recorded", outcome.barcode());
            }
            if let ScanOutcome::NeedsConfirmation { barcode, existing } = &outcome {
                session.request_variant(barcode, existing.clone());
            }
            ok(outcome)
        }
        Err(InventoryError::NotInCatalog(barcode)) => {
            session.set_last_unfound(Some(barcode.clone()));
            Err(InventoryError::NotInCatalog(barcode).into())
        }
        Err(e) => {
            session.set_last_unfound(None);
            Err(e.into())
        }
    }
}

/// POST /api/stocktake/scan/confirm
async fn confirm_scan_handler(
    State(state): State<AppState>,
    Json(body): Json<BarcodeBody>,
) -> ApiResult<ScanOutcome> {
    let mut session = state.lock();
    let barcode = crate::barcode::clean_barcode(&body.barcode);
    if !session.has_pending_variant(&barcode) {
        return Err(InventoryError::NothingToConfirm(format!("scan {}", barcode)).into());
    }
    let (_, mut stocktake) = state.settings.open_stocktake()?;
    let outcome = stocktake.record_confirmed(&barcode)?;
    session.take_variant(&barcode);
    ok(outcome)
}

/// DELETE /api/stocktake/scan/{barcode}
async fn remove_scan_handler(
    State(state): State<AppState>,
    Path(barcode): Path<String>,
) -> ApiResult<String> {
    let _guard = state.lock();
    let (_, mut stocktake) = state.settings.open_stocktake()?;
    stocktake.remove(&barcode)?;
    ok(crate::barcode::clean_barcode(&barcode))
}

/// POST /api/stocktake/clear - first step
async fn request_clear_handler(State(state): State<AppState>) -> ApiResult<Session> {
    let mut session = state.lock();
    session.request_clear();
    ok(session.clone())
}

/// POST /api/stocktake/clear/confirm
async fn confirm_clear_handler(State(state): State<AppState>) -> ApiResult<usize> {
    let mut session = state.lock();
    if !session.take_clear() {
        return Err(InventoryError::NothingToConfirm("clear scanned table".to_string()).into());
    }
    let (_, mut stocktake) = state.settings.open_stocktake()?;
    let cleared = stocktake.scan_log().len();
    stocktake.clear()?;
    ok(cleared)
}

/// POST /api/stocktake/cancel
async fn cancel_handler(State(state): State<AppState>) -> ApiResult<Session> {
    let mut session = state.lock();
    session.cancel();
    ok(session.clone())
}

/// GET /api/stocktake/reconcile
async fn reconcile_handler(State(state): State<AppState>) -> ApiResult<Reconciliation> {
    let _guard = state.lock();
    let (_, stocktake) = state.settings.open_stocktake()?;
    ok(stocktake.reconcile())
}

/// POST /api/stocktake/upload?format=csv&column=Barcode - raw file body
async fn upload_handler(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> ApiResult<Reconciliation> {
    let _guard = state.lock();
    let format = TableFormat::from_extension(&params.format)?;
    let table = read_table_bytes(format, &body)?;
    let (_, catalog) = state.settings.load_catalog()?;
    ok(reconcile_upload(&catalog, &table, params.column.as_deref())?)
}

/// GET /api/unfound - newest first
async fn unfound_handler(State(state): State<AppState>) -> ApiResult<Vec<UnfoundEntry>> {
    let _guard = state.lock();
    ok(state.settings.load_unfound()?.most_recent_first())
}

/// POST /api/unfound - records the given barcode, or the last unfound scan
async fn add_unfound_handler(
    State(state): State<AppState>,
    body: Option<Json<OptionalBarcodeBody>>,
) -> ApiResult<UnfoundEntry> {
    let mut session = state.lock();
    let given = body.and_then(|Json(b)| b.barcode);
    let from_session = given.is_none();
    let barcode = match given.or_else(|| session.last_unfound.clone()) {
        Some(barcode) => barcode,
        None => return Err(InventoryError::NothingToConfirm("unfound barcode".to_string()).into()),
    };
    let mut unfound = state.settings.load_unfound()?;
    let entry = unfound.add(&barcode)?.clone();
    unfound.save(&state.settings.unfound_log)?;
    if from_session {
        session.take_last_unfound();
    }
    ok(entry)
}

/// DELETE /api/unfound
async fn clear_unfound_handler(State(state): State<AppState>) -> ApiResult<usize> {
    let _guard = state.lock();
    let mut unfound = state.settings.load_unfound()?;
    let cleared = unfound.len();
    unfound.clear();
    unfound.save(&state.settings.unfound_log)?;
    ok(cleared)
}

/// GET /api/export/{kind}?format=csv|xlsx
async fn export_handler(
    State(state): State<AppState>,
    Path(kind): Path<ExportKind>,
    Query(params): Query<FormatParams>,
) -> Result<Response, ApiError> {
    let _guard = state.lock();
    let format = TableFormat::from_extension(&params.format)?;
    let (path, stocktake) = state.settings.open_stocktake()?;
    let archive = state.settings.load_archive()?;
    let unfound = state.settings.load_unfound()?;
    let export = render(
        kind,
        format,
        &ExportSources {
            inventory_path: &path,
            stocktake: &stocktake,
            archive: &archive,
            unfound: &unfound,
        },
    )?;

    let disposition = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        export.file_name,
        urlencoding::encode(&export.file_name)
    );
    Ok((
        [
            (header::CONTENT_TYPE, export.format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export.bytes,
    )
        .into_response())
}

/// Build the web server router
pub fn create_router(settings: Arc<Settings>) -> Router {
    let state = AppState {
        settings,
        session: Arc::new(Mutex::new(Session::new())),
    };

    Router::new()
        .route("/save_barcode", post(save_barcode_handler))
        .route("/api/catalog", get(catalog_handler))
        .route("/api/products", post(add_product_handler))
        .route(
            "/api/products/{barcode}",
            get(product_handler)
                .put(update_product_handler)
                .delete(request_delete_handler),
        )
        .route(
            "/api/products/{barcode}/delete/confirm",
            post(confirm_delete_handler),
        )
        .route("/api/generate/barcode", post(generate_barcode_handler))
        .route("/api/generate/framecode", post(generate_framecode_handler))
        .route("/api/labels/{barcode}", get(label_handler))
        .route("/api/labels/{barcode}/image", get(label_image_handler))
        .route("/api/stocktake", get(stocktake_handler))
        .route("/api/stocktake/scan", post(scan_handler))
        .route("/api/stocktake/scan/confirm", post(confirm_scan_handler))
        .route("/api/stocktake/scan/{barcode}", delete(remove_scan_handler))
        .route("/api/stocktake/clear", post(request_clear_handler))
        .route("/api/stocktake/clear/confirm", post(confirm_clear_handler))
        .route("/api/stocktake/cancel", post(cancel_handler))
        .route("/api/stocktake/reconcile", get(reconcile_handler))
        .route("/api/stocktake/upload", post(upload_handler))
        .route(
            "/api/unfound",
            get(unfound_handler)
                .post(add_unfound_handler)
                .delete(clear_unfound_handler),
        )
        .route("/api/export/{kind}", get(export_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the web server (async)
///
/// Binds to 0.0.0.0 so handheld scanners on the shop network can reach it.
pub async fn serve(settings: Settings, port: u16) -> crate::error::Result<()> {
    let app = create_router(Arc::new(settings));
    let addr = format!("0.0.0.0:{}", port);

    log::info!("Web service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
