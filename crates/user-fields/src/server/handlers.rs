//! Axum request handlers for all service endpoints.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::{
    ErrorResponse, FieldUpdateRequest, FieldValueResponse, GridColumn, GridResponse, GridRow,
    HealthResponse, ProfileField, ProfileResponse,
};
use common::ServiceError;
use serde::Deserialize;
use tracing::warn;

use super::{middleware::MAX_GRID_ROWS, state::AppState};
use crate::fields::Field;
use crate::store::{StoreError, UserId};

/// `GET /users/{id}/fields/{field}` — decrypt and return one field.
pub async fn read_field(
    State(state): State<AppState>,
    Path((user_id, slug)): Path<(UserId, String)>,
    headers: HeaderMap,
) -> Response {
    let result = async {
        let actor = actor_id(&state, &headers)?;
        let field = parse_field(&slug)?;
        let store = state.store.clone();
        let value = run_blocking(move || store.read(actor, user_id, field)).await?;
        Ok::<_, ServiceError>(FieldValueResponse {
            user_id,
            field: field.slug().to_owned(),
            value,
        })
    }
    .await;

    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(e) => error_response(e),
    }
}

/// `PUT /users/{id}/fields/{field}` — validate, encrypt and store one field.
///
/// An empty `value` clears the field.
pub async fn write_field(
    State(state): State<AppState>,
    Path((user_id, slug)): Path<(UserId, String)>,
    headers: HeaderMap,
    Json(req): Json<FieldUpdateRequest>,
) -> Response {
    let result = async {
        let actor = actor_id(&state, &headers)?;
        let field = parse_field(&slug)?;
        let store = state.store.clone();
        run_blocking(move || store.write(actor, user_id, field, &req.value)).await
    }
    .await;

    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

/// `GET /users/{id}/profile` — the profile form for one user.
pub async fn profile(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    headers: HeaderMap,
) -> Response {
    let result = async {
        let actor = actor_id(&state, &headers)?;
        let store = state.store.clone();
        let row = run_blocking(move || Ok(store.read_row(actor, user_id))).await?;

        let fields = row
            .into_iter()
            .map(|(field, value)| -> Result<ProfileField, StoreError> {
                Ok(ProfileField {
                    field: field.slug().to_owned(),
                    label: field.label().to_owned(),
                    value: value?,
                    placeholder: field.placeholder().to_owned(),
                    hint: field.hint().to_owned(),
                    description: field.description().map(str::to_owned),
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()
            .map_err(map_store_error)?;

        Ok::<_, ServiceError>(ProfileResponse { user_id, fields })
    }
    .await;

    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(e) => error_response(e),
    }
}

/// Query string of `GET /users`.
#[derive(Debug, Deserialize)]
pub struct GridQuery {
    /// Comma-separated user ids.
    pub ids: String,
}

/// `GET /users?ids=1,2,3` — results grid with one column per field.
///
/// Only users who may edit other users see the grid. A cell that is denied or
/// cannot be decrypted is returned as `null`; a backend failure fails the
/// whole grid.
pub async fn grid(
    State(state): State<AppState>,
    Query(query): Query<GridQuery>,
    headers: HeaderMap,
) -> Response {
    let result = async {
        let actor = actor_id(&state, &headers)?;
        if !state.policy.can_view_grid(actor) {
            return Err(ServiceError::Forbidden("results grid".into()));
        }
        let ids = parse_ids(&query.ids)?;

        let store = state.store.clone();
        let rows = run_blocking(move || {
            ids.into_iter()
                .map(|user_id| {
                    let cells = store
                        .read_row(actor, user_id)
                        .into_iter()
                        .map(|(_, value)| grid_cell(value))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(GridRow { user_id, cells })
                })
                .collect::<Result<Vec<_>, StoreError>>()
        })
        .await?;

        let columns = Field::ALL
            .into_iter()
            .map(|f| GridColumn {
                key: f.column_key().to_owned(),
                label: f.label().to_owned(),
            })
            .collect();

        Ok::<_, ServiceError>(GridResponse { columns, rows })
    }
    .await;

    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(e) => error_response(e),
    }
}

/// `GET /health` — liveness and readiness check.
///
/// Returns `200 OK` when at least one membership group is loaded.
/// Returns `503 Service Unavailable` otherwise. The key is always loaded once
/// the server is up; startup aborts without it.
pub async fn health(State(state): State<AppState>) -> Response {
    let groups_loaded = state.directory.group_count();

    let (status_code, status_str) = if groups_loaded > 0 {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let body = HealthResponse {
        status: status_str.into(),
        key_loaded: true,
        groups_loaded,
    };
    (status_code, Json(body)).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Resolve the acting user from the configured header.
fn actor_id(state: &AppState, headers: &HeaderMap) -> Result<UserId, ServiceError> {
    let name = state.actor_header_name.as_str();
    let value = headers
        .get(name)
        .ok_or_else(|| ServiceError::BadRequest(format!("missing {name} header")))?;
    value
        .to_str()
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(|| ServiceError::BadRequest(format!("{name} header is not a user id")))
}

fn parse_field(slug: &str) -> Result<Field, ServiceError> {
    Field::from_slug(slug).map_err(|e| ServiceError::NotFound(e.to_string()))
}

/// Map one per-field read result to a grid cell.
fn grid_cell(value: Result<String, StoreError>) -> Result<Option<String>, StoreError> {
    match value {
        Ok(v) => Ok(Some(v)),
        Err(StoreError::Unauthorized | StoreError::DecryptionFailed) => Ok(None),
        Err(e) => Err(e),
    }
}

fn parse_ids(raw: &str) -> Result<Vec<UserId>, ServiceError> {
    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse()
                .map_err(|_| ServiceError::BadRequest(format!("invalid user id: {s}")))
        })
        .collect::<Result<Vec<UserId>, _>>()?;
    if ids.len() > MAX_GRID_ROWS {
        return Err(ServiceError::BadRequest(format!(
            "at most {MAX_GRID_ROWS} users per request"
        )));
    }
    Ok(ids)
}

/// Run a store operation off the async executor; backends may block on disk.
async fn run_blocking<T, F>(op: F) -> Result<T, ServiceError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| {
            warn!(error = %e, "store task panicked");
            ServiceError::Unavailable("store task failed".into())
        })?
        .map_err(map_store_error)
}

fn map_store_error(err: StoreError) -> ServiceError {
    match err {
        StoreError::Unauthorized => ServiceError::Forbidden("access to field denied".into()),
        StoreError::InvalidFormat(field) => ServiceError::InvalidFormat(field.slug().to_owned()),
        StoreError::DecryptionFailed | StoreError::EncryptionFailed => {
            ServiceError::FieldUnreadable
        }
        StoreError::BackendUnavailable(e) => {
            warn!(error = %e, "storage backend failed");
            ServiceError::Unavailable("storage backend".into())
        }
    }
}

fn error_response(err: ServiceError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorResponse::from(&err))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    use axum::{body::Body, http::Request, Router};
    use bytes::Bytes;
    use tower::ServiceExt;

    use crate::crypto::FieldKey;
    use crate::policy::{MembershipDirectory, MembershipSnapshot};
    use crate::server::router;
    use crate::store::{Backend, BackendError};

    const MEMBER: UserId = 2;
    const EDITOR: UserId = 1;
    const OUTSIDER: UserId = 9;

    fn test_state() -> AppState {
        let state = AppState::default();
        let mut groups = HashMap::new();
        groups.insert("Sektionsaktiva".to_owned(), [EDITOR, MEMBER].into_iter().collect());
        state.directory.replace_all(MembershipSnapshot {
            groups,
            editors: [EDITOR].into_iter().collect(),
        });
        state
    }

    fn app(state: &AppState) -> Router {
        router::build(state.clone())
    }

    fn get(uri: &str, actor: UserId) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("X-Actor-Id", actor.to_string())
            .body(Body::empty())
            .unwrap()
    }

    fn put(uri: &str, actor: UserId, value: &str) -> Request<Body> {
        let body = serde_json::json!({ "value": value }).to_string();
        Request::builder()
            .method("PUT")
            .uri(uri)
            .header("X-Actor-Id", actor.to_string())
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn write_then_read_own_field() {
        let state = test_state();
        let resp = app(&state)
            .oneshot(put("/users/2/fields/personal-id", MEMBER, "990101-1234"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = app(&state)
            .oneshot(get("/users/2/fields/personal-id", MEMBER))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["value"], "990101-1234");
        assert_eq!(body["field"], "personal-id");
    }

    #[tokio::test]
    async fn invalid_format_returns_400() {
        let state = test_state();
        let resp = app(&state)
            .oneshot(put("/users/2/fields/personal-id", MEMBER, "123456789"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = json_body(resp).await;
        assert_eq!(body["code"], "invalid_format");
    }

    #[tokio::test]
    async fn outsider_is_forbidden() {
        let state = test_state();
        let resp = app(&state)
            .oneshot(get("/users/9/fields/phone", OUTSIDER))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = app(&state)
            .oneshot(put("/users/9/fields/phone", OUTSIDER, "0701234567"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn member_cannot_read_other_member() {
        let state = test_state();
        let resp = app(&state)
            .oneshot(get("/users/1/fields/phone", MEMBER))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn unknown_field_returns_404() {
        let state = test_state();
        let resp = app(&state)
            .oneshot(get("/users/2/fields/shoe-size", MEMBER))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn non_numeric_actor_returns_400() {
        let state = test_state();
        let req = Request::builder()
            .uri("/users/2/fields/phone")
            .header("X-Actor-Id", "admin")
            .body(Body::empty())
            .unwrap();
        let resp = app(&state).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn profile_lists_every_field() {
        let state = test_state();
        app(&state)
            .oneshot(put("/users/2/fields/phone", MEMBER, "0701234567"))
            .await
            .unwrap();

        let resp = app(&state)
            .oneshot(get("/users/2/profile", MEMBER))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        let fields = body["fields"].as_array().unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0]["field"], "personal-id");
        assert_eq!(fields[0]["value"], "");
        assert_eq!(fields[0]["placeholder"], "YYMMDD-XXXX");
        assert!(fields[0]["description"]
            .as_str()
            .unwrap()
            .contains("Fysikteknologsektionen will save it in an encrypted format"));
        assert!(fields[1].get("description").is_none());
        assert_eq!(fields[1]["value"], "0701234567");
    }

    #[tokio::test]
    async fn profile_forbidden_for_outsider() {
        let state = test_state();
        let resp = app(&state)
            .oneshot(get("/users/9/profile", OUTSIDER))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn grid_shows_decrypted_columns_for_editor() {
        let state = test_state();
        app(&state)
            .oneshot(put("/users/2/fields/personal-id", EDITOR, "990101-1234"))
            .await
            .unwrap();

        let resp = app(&state)
            .oneshot(get("/users?ids=2,3", EDITOR))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["columns"][0]["key"], "personal-number");
        assert_eq!(body["columns"][1]["key"], "booked-phone");
        assert_eq!(body["rows"][0]["user_id"], 2);
        assert_eq!(body["rows"][0]["cells"][0], "990101-1234");
        assert_eq!(body["rows"][0]["cells"][1], "");
        assert_eq!(body["rows"][1]["cells"][0], "");
    }

    struct UnavailableBackend;

    impl Backend for UnavailableBackend {
        fn put(&self, _: UserId, _: &str, _: Bytes) -> Result<(), BackendError> {
            Err(BackendError::Poisoned)
        }

        fn get(&self, _: UserId, _: &str) -> Result<Option<Bytes>, BackendError> {
            Err(BackendError::Poisoned)
        }
    }

    #[tokio::test]
    async fn grid_fails_when_backend_is_unavailable() {
        let state = AppState::new(
            Arc::new(FieldKey::generate()),
            Arc::new(UnavailableBackend),
            MembershipDirectory::new(),
            "Sektionsaktiva".into(),
            "X-Actor-Id".into(),
        );
        let mut groups = HashMap::new();
        groups.insert("Sektionsaktiva".to_owned(), [EDITOR, MEMBER].into_iter().collect());
        state.directory.replace_all(MembershipSnapshot {
            groups,
            editors: [EDITOR].into_iter().collect(),
        });

        let resp = app(&state)
            .oneshot(get("/users?ids=2", EDITOR))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = json_body(resp).await;
        assert_eq!(body["code"], "service_unavailable");
    }

    #[test]
    fn grid_cell_hides_denied_and_undecryptable_values() {
        assert_eq!(grid_cell(Ok("x".into())).unwrap(), Some("x".to_owned()));
        assert_eq!(grid_cell(Err(StoreError::Unauthorized)).unwrap(), None);
        assert_eq!(grid_cell(Err(StoreError::DecryptionFailed)).unwrap(), None);
        assert!(matches!(
            grid_cell(Err(StoreError::BackendUnavailable(BackendError::Poisoned))),
            Err(StoreError::BackendUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn grid_forbidden_for_plain_member() {
        let state = test_state();
        let resp = app(&state)
            .oneshot(get("/users?ids=2", MEMBER))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn grid_rejects_bad_ids() {
        let state = test_state();
        let resp = app(&state)
            .oneshot(get("/users?ids=2,x", EDITOR))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn health_ok_when_groups_loaded() {
        let state = test_state();
        let resp = app(&state)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["groups_loaded"], 1);
        assert_eq!(body["key_loaded"], true);
    }

    #[test]
    fn parse_ids_skips_blanks() {
        assert_eq!(parse_ids("1, 2,,3").unwrap(), vec![1, 2, 3]);
        assert!(parse_ids("").unwrap().is_empty());
    }

    #[test]
    fn parse_ids_enforces_limit() {
        let many = (0..=MAX_GRID_ROWS)
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(",");
        assert!(parse_ids(&many).is_err());
    }

    #[test]
    fn store_errors_map_to_status_codes() {
        assert_eq!(map_store_error(StoreError::Unauthorized).http_status(), 403);
        assert_eq!(
            map_store_error(StoreError::InvalidFormat(Field::Phone)).http_status(),
            400
        );
        assert_eq!(map_store_error(StoreError::DecryptionFailed).http_status(), 500);
        assert_eq!(
            map_store_error(StoreError::BackendUnavailable(BackendError::Poisoned))
            .http_status(),
            503
        );
    }
}
