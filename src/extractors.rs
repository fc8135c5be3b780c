use axum::{
    extract::{FromRequestParts, Query},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::error::ErrorResponse;
use crate::units::Units;

#[derive(Debug, Deserialize)]
struct UnitsQuery {
    units: Option<String>,
}

/// Optional `?units=` override for a single read
///
/// Absent means "use the session's unit system"; an unrecognized value is
/// rejected rather than silently ignored.
#[derive(Debug)]
pub struct UnitsParam(pub Option<Units>);

impl<S> FromRequestParts<S> for UnitsParam
where
    S: Send + Sync,
{
    type Rejection = ParamRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Ok(Query(query)) = Query::<UnitsQuery>::from_request_parts(parts, state).await else {
            return Ok(UnitsParam(None));
        };

        match query.units {
            None => Ok(UnitsParam(None)),
            Some(raw) => raw.parse().map(|units| UnitsParam(Some(units))).map_err(ParamRejection),
        }
    }
}

/// Rejection type for query parameter extraction failures
#[derive(Debug)]
pub struct ParamRejection(pub String);

impl IntoResponse for ParamRejection {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::with_code(self.0, "INVALID_PARAMETER")),
        )
            .into_response()
    }
}
