// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, branch, course, enrollment, exam, practice, semester},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, staff_middleware},
};

/// Assembles the main application router.
///
/// * Public: auth, read-only catalogue (branches, semesters, courses).
/// * Authenticated: enrolments, exams, practice attempts.
/// * Staff: course, question bank and exam authoring.
/// * Admin: users, branches, semesters.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:5173"),
        HeaderValue::from_static("http://127.0.0.1:5173"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_layer = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let catalogue_routes = Router::new()
        .route("/branches", get(branch::list_branches))
        .route("/semesters", get(semester::list_semesters))
        .route("/courses", get(course::list_courses))
        .route("/courses/{id}", get(course::get_course));

    let practice_routes = Router::new()
        .route("/", get(practice::list_history))
        .route("/generate", post(practice::generate_attempt))
        .route(
            "/{id}",
            get(practice::get_attempt).post(practice::start_attempt),
        )
        .route("/{id}/time", post(practice::update_time))
        .route("/{id}/submit", post(practice::submit_attempt))
        .layer(auth_layer.clone());

    let member_routes = Router::new()
        .route(
            "/enrollments",
            get(enrollment::list_my_courses).post(enrollment::enroll),
        )
        .route("/enrollments/{course_id}", delete(enrollment::unenroll))
        .route("/exams", get(exam::list_exams))
        .route("/exams/{id}", get(exam::get_exam))
        .layer(auth_layer.clone());

    // Auth runs first (outermost), then the role check.
    let staff_routes = Router::new()
        .route("/courses", post(course::create_course))
        .route(
            "/courses/{id}",
            put(course::update_course).delete(course::delete_course),
        )
        .route(
            "/courses/{id}/questions",
            get(course::list_course_questions).post(course::create_course_question),
        )
        .route(
            "/courses/{id}/questions/{question_id}",
            delete(course::delete_course_question),
        )
        .route("/exams", post(exam::create_exam))
        .route("/exams/{id}", put(exam::update_exam).delete(exam::delete_exam))
        .route("/staff/enrollments", post(enrollment::staff_enroll))
        .layer(middleware::from_fn(staff_middleware))
        .layer(auth_layer.clone());

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route("/users/{id}", delete(admin::delete_user))
        .route("/branches", post(branch::create_branch))
        .route(
            "/branches/{id}",
            put(branch::update_branch).delete(branch::delete_branch),
        )
        .route("/semesters", post(semester::create_semester))
        .route(
            "/semesters/{id}",
            put(semester::update_semester).delete(semester::delete_semester),
        )
        .layer(middleware::from_fn(admin_middleware))
        .layer(auth_layer);

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/practice", practice_routes)
        .nest(
            "/api",
            catalogue_routes
                .merge(member_routes)
                .merge(staff_routes),
        )
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
