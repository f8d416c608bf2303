use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

use crate::api::handlers;
use crate::store::traits::Store;

pub fn create_router<S: Store + 'static>() -> Router<Arc<S>> {
    let api = Router::new()
        // Groups
        .route("/groups", get(handlers::list_groups::<S>))
        .route("/groups", post(handlers::create_group::<S>))
        .route("/groups/:group_id", get(handlers::get_group::<S>))
        .route("/groups/:group_id", put(handlers::update_group::<S>))
        .route("/groups/:group_id", delete(handlers::delete_group::<S>))
        .route(
            "/groups/:group_id/students",
            get(handlers::list_group_students::<S>),
        )
        .route(
            "/groups/:group_id/students",
            post(handlers::add_group_students::<S>),
        )
        .route(
            "/groups/:group_id/students",
            delete(handlers::remove_group_students::<S>),
        )
        // Students
        .route("/students", get(handlers::list_students::<S>))
        .route("/students", post(handlers::create_student::<S>))
        .route("/students/:student_id", get(handlers::get_student::<S>))
        .route("/students/:student_id", put(handlers::update_student::<S>))
        .route(
            "/students/:student_id",
            delete(handlers::delete_student::<S>),
        )
        .route(
            "/students/:student_id/courses",
            get(handlers::list_student_courses::<S>),
        )
        .route(
            "/students/:student_id/courses",
            post(handlers::add_student_courses::<S>),
        )
        .route(
            "/students/:student_id/courses",
            delete(handlers::remove_student_courses::<S>),
        )
        // Courses
        .route("/courses", get(handlers::list_courses::<S>))
        .route("/courses", post(handlers::create_course::<S>))
        .route("/courses/:course_id", get(handlers::get_course::<S>))
        .route("/courses/:course_id", put(handlers::update_course::<S>))
        .route("/courses/:course_id", delete(handlers::delete_course::<S>))
        .route(
            "/courses/:course_id/students",
            get(handlers::list_course_students::<S>),
        )
        .route(
            "/courses/:course_id/students",
            post(handlers::add_course_students::<S>),
        )
        .route(
            "/courses/:course_id/students",
            delete(handlers::remove_course_students::<S>),
        );

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api)
}
