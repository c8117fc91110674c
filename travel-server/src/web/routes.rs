//! HTTP route handlers.

use axum::body::Bytes;
use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
};
use serde::de::DeserializeOwned;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::auth::Principal;
use crate::domain::{PlanFields, ProfileFields};
use crate::service::Listing;

use super::auth::require_auth;
use super::dto::*;
use super::error::AppError;
use super::state::AppState;

/// Create the application router.
///
/// Everything under `/api` requires a bearer token.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/itineraryPlan", post(create_plan).get(list_plans))
        .route(
            "/itineraryPlan/:id",
            get(get_plan).put(update_plan).delete(delete_plan),
        )
        .route("/users", post(upsert_profile))
        .route(
            "/users/:id",
            get(get_profile).put(update_profile).delete(delete_profile),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Parse a JSON body by hand so malformed input is a 400 rather than
/// axum's 422. Only the error position is logged; bodies carry personal data.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|e| {
        warn!(
            len = body.len(),
            line = e.line(),
            column = e.column(),
            category = ?e.classify(),
            "JSON parse error"
        );
        AppError::BadRequest {
            message: format!("Invalid JSON: {e}"),
        }
    })
}

async fn create_plan(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    body: Bytes,
) -> Result<(StatusCode, Json<CreatedResponse>), AppError> {
    let fields: PlanFields = parse_body(&body)?;
    let id = state.itineraries.create(&principal, &fields).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

async fn list_plans(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<PlanResponse>>, AppError> {
    match state.itineraries.list(&principal).await? {
        Listing::Empty => Err(AppError::NotFound {
            message: "No itinerary found".to_string(),
        }),
        Listing::Items(plans) => Ok(Json(plans.into_iter().map(PlanResponse::from).collect())),
    }
}

async fn get_plan(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<PlanResponse>, AppError> {
    let stored = state.itineraries.get(&principal, &id).await?;
    Ok(Json(stored.into()))
}

async fn update_plan(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<UpdatedPlanResponse>, AppError> {
    let patch: PlanFields = parse_body(&body)?;
    let stored = state.itineraries.update(&principal, &id, &patch).await?;
    Ok(Json(UpdatedPlanResponse {
        message: "Itinerary updated successfully".to_string(),
        plan: stored.into(),
    }))
}

async fn delete_plan(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    state.itineraries.delete(&principal, &id).await?;
    Ok(Json(MessageResponse::new("Itinerary deleted successfully")))
}

async fn upsert_profile(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    body: Bytes,
) -> Result<Json<CreatedResponse>, AppError> {
    let fields: ProfileFields = parse_body(&body)?;
    let id = state.profiles.upsert(&principal, &fields).await?;
    Ok(Json(CreatedResponse { id }))
}

async fn get_profile(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = state.profiles.get(&principal, &id).await?;
    Ok(Json(ProfileResponse { id, profile }))
}

async fn update_profile(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<MessageResponse>, AppError> {
    let fields: ProfileFields = parse_body(&body)?;
    state.profiles.update(&principal, &id, &fields).await?;
    Ok(Json(MessageResponse::new("User profile updated successfully")))
}

async fn delete_profile(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    state.profiles.delete(&principal, &id).await?;
    Ok(Json(MessageResponse::new("User profile deleted successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Method, Request, header};
    use axum::response::Response;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::auth::StaticVerifier;
    use crate::service::PlanRules;
    use crate::store::MemoryStore;

    fn app() -> Router {
        let verifier = StaticVerifier::new()
            .with_token("alice-token", "alice")
            .with_token("bob-token", "bob");
        let state = AppState::new(
            Arc::new(MemoryStore::new()),
            Arc::new(verifier),
            PlanRules::default(),
        );
        create_router(state)
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        app.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn rome_trip() -> Value {
        json!({
            "title": "Summer in Rome",
            "city": "Rome",
            "startDate": "2024-08-01",
            "endDate": "2024-08-05",
            "destinations": [
                {"name": "Colosseum", "location": {"latitude": 41.89, "longitude": 12.49},
                 "visitTime": "2024-08-02T10:00:00Z"}
            ]
        })
    }

    #[test]
    fn malformed_body_error_omits_body_text() {
        let body = Bytes::from_static(br#"{"title": "Ada Lovelace, 12 Rue de Rivoli" "#);

        let err = parse_body::<PlanFields>(&body).unwrap_err();
        let AppError::BadRequest { message } = err else {
            panic!("expected BadRequest, got {err:?}");
        };
        assert!(message.starts_with("Invalid JSON: "));
        assert!(!message.contains("Rivoli"));
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = app();
        let response = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn api_requires_token() {
        let app = app();

        let response = send(&app, Method::GET, "/api/itineraryPlan", None, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response =
            send(&app, Method::GET, "/api/itineraryPlan", Some("forged"), None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"], "Unauthorized");
    }

    #[tokio::test]
    async fn plan_lifecycle() {
        let app = app();
        let alice = Some("alice-token");

        let response = send(&app, Method::GET, "/api/itineraryPlan", alice, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(&app, Method::POST, "/api/itineraryPlan", alice, Some(rome_trip())).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let id = json_body(response).await["id"].as_str().unwrap().to_string();
        let uri = format!("/api/itineraryPlan/{id}");

        let response = send(&app, Method::GET, &uri, alice, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let plan = json_body(response).await;
        assert_eq!(plan["id"], id.as_str());
        assert_eq!(plan["userId"], "alice");
        assert_eq!(plan["startDate"], "2024-08-01");
        assert_eq!(plan["endDate"], "2024-08-05");

        let response = send(&app, Method::PUT, &uri, alice, Some(json!({"title": "Roman Holiday"}))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["message"], "Itinerary updated successfully");
        assert_eq!(body["plan"]["title"], "Roman Holiday");
        assert_eq!(body["plan"]["city"], "Rome");

        let response = send(&app, Method::GET, "/api/itineraryPlan", alice, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await.as_array().unwrap().len(), 1);

        let response = send(&app, Method::DELETE, &uri, alice, None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&app, Method::GET, &uri, alice, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_plans_are_bad_requests() {
        let app = app();
        let alice = Some("alice-token");

        let mut clash = rome_trip();
        clash["destinations"] = json!([
            {"name": "A", "location": {"latitude": 0.0, "longitude": 0.0}, "visitTime": "2024-08-02T10:00:00Z"},
            {"name": "B", "location": {"latitude": 0.0, "longitude": 0.0}, "visitTime": "2024-08-02T10:00:00Z"}
        ]);

        let mut outside = rome_trip();
        outside["destinations"][0]["visitTime"] = json!("2024-09-01T10:00:00Z");

        let mut reversed = rome_trip();
        reversed["endDate"] = json!("2024-07-01");

        let mut garbled = rome_trip();
        garbled["startDate"] = json!("next tuesday");

        for body in [clash, outside, reversed, garbled, json!({"title": "Trip"})] {
            let response = send(&app, Method::POST, "/api/itineraryPlan", alice, Some(body)).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/itineraryPlan")
            .header(header::AUTHORIZATION, "Bearer alice-token")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(&app, Method::GET, "/api/itineraryPlan", alice, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn plans_are_private() {
        let app = app();

        let response = send(&app, Method::POST, "/api/itineraryPlan", Some("alice-token"), Some(rome_trip())).await;
        let id = json_body(response).await["id"].as_str().unwrap().to_string();
        let uri = format!("/api/itineraryPlan/{id}");

        for method in [Method::GET, Method::DELETE] {
            let response = send(&app, method, &uri, Some("bob-token"), None).await;
            assert_eq!(response.status(), StatusCode::FORBIDDEN);
        }
        let response = send(&app, Method::PUT, &uri, Some("bob-token"), Some(json!({"title": "x"}))).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = send(&app, Method::GET, "/api/itineraryPlan", Some("bob-token"), None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn profile_lifecycle() {
        let app = app();
        let alice = Some("alice-token");

        let response = send(
            &app,
            Method::POST,
            "/api/users",
            alice,
            Some(json!({"name": "Alice", "gender": "Female", "destinationPreferences": ["museum"]})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["id"], "alice");

        // Readable by anyone signed in
        let response = send(&app, Method::GET, "/api/users/alice", Some("bob-token"), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let profile = json_body(response).await;
        assert_eq!(profile["id"], "alice");
        assert_eq!(profile["name"], "Alice");
        assert_eq!(profile["destinationPreferences"], json!(["museum"]));

        let response = send(&app, Method::PUT, "/api/users/alice", Some("bob-token"), Some(json!({"name": "Bob"}))).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = send(&app, Method::PUT, "/api/users/alice", alice, Some(json!({"name": "Al1ce"}))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await["error"],
            "Name can not contain numbers or symbols"
        );

        let response = send(&app, Method::PUT, "/api/users/alice", alice, Some(json!({"gender": "Other"}))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&app, Method::DELETE, "/api/users/alice", Some("bob-token"), None).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = send(&app, Method::DELETE, "/api/users/alice", alice, None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&app, Method::GET, "/api/users/alice", alice, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
