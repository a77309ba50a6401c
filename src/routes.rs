// src/routes.rs

use axum::{
    Router,
    http::Method,
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, quiz, results},
    state::AppState,
    utils::jwt::admin_middleware,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, quiz, admin).
/// * Applies global middleware (Trace, CORS).
/// * Serves a static front end when `STATIC_DIR` is configured.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            "http://localhost:3000".parse().expect("valid origin"),
            "http://127.0.0.1:3000".parse().expect("valid origin"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let admin_gate = middleware::from_fn_with_state(state.clone(), admin_middleware);

    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .merge(
            Router::new()
                .route("/logout", post(auth::logout))
                .layer(admin_gate.clone()),
        );

    let quiz_routes = Router::new()
        .route("/active", get(quiz::get_active_quiz))
        .route("/sessions", post(quiz::start_session))
        .route(
            "/sessions/{id}",
            get(quiz::get_session).delete(quiz::abandon_session),
        )
        .route("/sessions/{id}/answer", put(quiz::select_answer))
        .route("/sessions/{id}/next", post(quiz::next_question))
        .route("/sessions/{id}/prev", post(quiz::previous_question))
        .route("/sessions/{id}/submit", post(quiz::submit_session));

    let admin_routes = Router::new()
        .route("/quizzes", get(admin::list_quizzes).post(admin::create_quiz))
        .route("/quizzes/import", post(admin::import_quizzes))
        .route("/quizzes/{name}", get(admin::get_quiz))
        .route("/quizzes/{name}/activate", put(admin::activate_quiz))
        .route("/quizzes/{name}/export", get(admin::export_quiz))
        .route("/quizzes/{name}/delete-request", post(admin::request_quiz_delete))
        .route("/quizzes/{name}/questions", post(admin::add_question))
        .route(
            "/quizzes/{name}/questions/{index}",
            put(admin::update_question).delete(admin::delete_question),
        )
        .route("/results", get(results::list_results))
        .route("/results/stats", get(results::results_stats))
        .route("/results/export", get(results::export_results))
        .route("/results/clear-request", post(results::request_results_clear))
        .route("/results/{index}", get(results::result_detail))
        .route(
            "/results/{index}/delete-request",
            post(results::request_result_delete),
        )
        .route("/intents/{id}/confirm", post(admin::confirm_intent))
        .route("/intents/{id}", delete(admin::cancel_intent))
        .layer(admin_gate);

    let mut router = Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/quiz", quiz_routes)
        .nest("/api/admin", admin_routes);

    if let Some(dir) = &state.config.static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
