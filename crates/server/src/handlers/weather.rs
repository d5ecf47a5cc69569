//! Weather lookup endpoint.

use crate::error::ApiResult;
use crate::state::AppState;
use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use serde::Deserialize;
use stratus_core::{City, WeatherRecord};

/// Query string for `GET /weather`.
#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    pub city: Option<String>,
}

/// GET /weather?city=<name>
pub async fn get_weather(
    State(state): State<AppState>,
    query: Result<Query<WeatherQuery>, QueryRejection>,
) -> ApiResult<Json<WeatherRecord>> {
    // An unparseable query string is treated as a missing city
    let raw = match query {
        Ok(Query(query)) => query.city,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Unparseable weather query");
            None
        }
    };

    let city = City::parse(raw.as_deref())?;
    let record = state.gateway.get(&city).await?;
    Ok(Json(record))
}
