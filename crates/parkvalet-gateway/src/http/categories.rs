use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::http::spots::TypeFilter;

/// GET /api/categories — the mapping, plus the resolution of `?type=` if given.
pub async fn categories(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<TypeFilter>,
) -> Json<Value> {
    let map = state.parking.categories();
    let resolved = filter.vehicle_type.map(|raw| {
        json!({
            "type": raw,
            "category": map.categorize(&raw),
        })
    });
    Json(json!({
        "categories": map,
        "resolved": resolved,
    }))
}
