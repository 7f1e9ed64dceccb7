use axum::Json;
use serde_json::{json, Value};

pub const SERVICE_NAME: &str = "horas-registro-civil API";

pub async fn health() -> Json<Value> {
    Json(json!({
        "message": SERVICE_NAME,
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "slots": "GET /slots?procedure_id=6&region_id=13",
        },
    }))
}
