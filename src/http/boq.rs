//! `POST /k-col/boq-report/compute`

use super::ApiError;
use crate::boq::{self, BoqReport, BoqRequest};
use crate::session::Principal;
use axum::{Extension, Json};
use tracing::debug;

pub async fn compute(
    Extension(principal): Extension<Option<Principal>>,
    Json(request): Json<BoqRequest>,
) -> Result<Json<BoqReport>, ApiError> {
    let items = request.items.len();
    let report = boq::report(request).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    debug!(
        user_id = ?principal.map(|p| p.user_id),
        items,
        plates = report.plates.len(),
        "boq report computed"
    );
    Ok(Json(report))
}
