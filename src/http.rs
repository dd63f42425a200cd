//! HTTP surface of the master server.

use crate::coordinator::Coordinator;
use crate::error::{GameError, GameErrorKind};
use crate::game::{Game, ResultSnapshot, Symbol};
use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{HeaderValue, Method, Request, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use tower::ServiceBuilder;
use tracing::{debug, error, info, instrument, warn};

/// Body returned for a successful registration.
pub const CREATED_BODY: &str = "Game created";

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        let (status, body) = match self.kind {
            GameErrorKind::BadRequest => (
                StatusCode::BAD_REQUEST,
                format!("400 - Bad Request, {}", self.message),
            ),
            GameErrorKind::NotFound => (
                StatusCode::NOT_FOUND,
                "404 - Not Found, game does not exist".to_string(),
            ),
            GameErrorKind::Conflict => (
                StatusCode::CONFLICT,
                "409 - Conflict, game already registered".to_string(),
            ),
            GameErrorKind::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                "405 - Method not allowed".to_string(),
            ),
            GameErrorKind::Internal => {
                error!(error = %self, "Internal failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "500 - Internal Server Error".to_string(),
                )
            }
        };
        debug!(%status, error = %self, "Responding with error");
        (status, body).into_response()
    }
}

/// Builds the router for all game endpoints.
///
/// Every request is logged on arrival; unsupported verbs on known paths get
/// 405 and unknown paths get 404.
#[instrument(skip(coordinator))]
pub fn router(coordinator: Coordinator) -> Router {
    Router::new()
        .route("/registry", post(register_game).fallback(method_not_allowed))
        .route("/games", get(list_games).fallback(method_not_allowed))
        .route(
            "/games/{board_id}",
            get(fetch_game)
                .post(submit_move)
                .fallback(method_not_allowed),
        )
        .fallback(unknown_path)
        .with_state(coordinator)
        .layer(
            ServiceBuilder::new()
                .map_request(|req: Request<Body>| {
                    info!(method = %req.method(), uri = %req.uri(), "Incoming HTTP request");
                    req
                })
                .map_response(|resp: Response| {
                    info!(status = %resp.status(), "Response sent");
                    resp
                }),
        )
}

/// Decodes a JSON request body, reporting malformed input as a client error.
fn decode<T: DeserializeOwned>(body: &Bytes) -> Result<T, GameError> {
    serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, "Malformed request body");
        GameError::bad_request(format!("malformed body: {}", e))
    })
}

#[instrument(skip(coordinator, body), fields(body_len = body.len()))]
async fn register_game(
    State(coordinator): State<Coordinator>,
    body: Bytes,
) -> Result<Response, GameError> {
    let proposed: Game = decode(&body)?;
    let registration = coordinator.register(proposed)?;

    let location = HeaderValue::from_bytes(registration.location.as_bytes()).map_err(|e| {
        GameError::internal(format!("Invalid Content-Location header: {}", e))
    })?;

    Ok((
        StatusCode::CREATED,
        [(header::CONTENT_LOCATION, location)],
        CREATED_BODY,
    )
        .into_response())
}

#[instrument(skip(coordinator))]
async fn list_games(State(coordinator): State<Coordinator>) -> Response {
    let games = coordinator.list();
    info!(count = games.len(), "Returning games");
    (
        [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
        Json(games),
    )
        .into_response()
}

#[instrument(skip(coordinator))]
async fn fetch_game(
    State(coordinator): State<Coordinator>,
    Path(board_id): Path<String>,
) -> Result<Response, GameError> {
    let game = coordinator.fetch(&board_id)?;
    Ok((
        [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
        Json(game),
    )
        .into_response())
}

#[instrument(skip(coordinator, body))]
async fn submit_move(
    State(coordinator): State<Coordinator>,
    Path(board_id): Path<String>,
    body: Bytes,
) -> Result<Json<ResultSnapshot>, GameError> {
    // Unknown boards are reported before the body is looked at.
    coordinator.fetch(&board_id)?;
    let symbol: Symbol = decode(&body)?;
    let snapshot = coordinator.submit(&board_id, symbol)?;
    Ok(Json(snapshot))
}

#[instrument]
async fn unknown_path(uri: Uri) -> (StatusCode, &'static str) {
    debug!("No route");
    (StatusCode::NOT_FOUND, "404 - Not Found")
}

#[instrument]
async fn method_not_allowed(method: Method, uri: Uri) -> GameError {
    warn!("Method not allowed");
    GameError::method_not_allowed(format!("{} {}", method, uri.path()))
}
