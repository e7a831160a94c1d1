use std::sync::Arc;

use axum::{
    Router,
    extract::{State, rejection::JsonRejection},
    response::Json,
    routing::post,
};

use crate::{
    IceError,
    models::{Shipment, ShipmentRequest},
    shipment_service::ShipmentService,
};

pub fn router(service: Arc<ShipmentService>) -> Router {
    Router::new()
        .route("/", post(create_shipment))
        .with_state(service)
}

async fn create_shipment(
    State(service): State<Arc<ShipmentService>>,
    payload: Result<Json<ShipmentRequest>, JsonRejection>,
) -> Result<Json<Shipment>, IceError> {
    let Json(request) = payload.map_err(|rejection| IceError::validation(rejection.body_text()))?;
    let shipment = service.compute(request).await?;
    Ok(Json(shipment))
}
