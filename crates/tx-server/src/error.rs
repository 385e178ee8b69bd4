//! Maps a [`TxError`] to an HTTP response carrying an `OperationOutcome`
//! body, the only place in this binary that performs that conversion
//! (spec §6 "OperationOutcome", mirroring `tx_operations::outcome`).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tx_core::TxError;

pub struct AppError(pub TxError);

impl From<TxError> for AppError {
    fn from(err: TxError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(tx_operations::http_status(&self.0)).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = tx_operations::operation_outcome(&self.0);
        (status, Json(body)).into_response()
    }
}
