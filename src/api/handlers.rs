use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::DomainError;
use crate::logic::service;
use crate::model::{
    Course, CourseIdList, CourseUpdate, Group, GroupUpdate, Id, NewCourse, NewGroup, NewStudent,
    Student, StudentIdList, StudentUpdate,
};
use crate::store::traits::Store;

pub type AppState<S> = Arc<S>;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(err: DomainError) -> ApiError {
    let status = match &err {
        DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
        DomainError::DuplicateName { .. }
        | DomainError::MissingRequiredField(_)
        | DomainError::NotMember { .. } => StatusCode::BAD_REQUEST,
        DomainError::Database(_) | DomainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        log::error!("request failed: {}", err);
    }
    (
        status,
        Json(ErrorResponse {
            message: err.to_string(),
        }),
    )
}

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Deserialize)]
pub struct GroupsQuery {
    pub max_students: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StudentsQuery {
    pub course_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

pub async fn list_groups<S: Store>(
    State(store): State<AppState<S>>,
    Query(query): Query<GroupsQuery>,
) -> Result<Json<Vec<Group>>, ApiError> {
    let groups = service::list_groups(&*store, query.max_students)
        .await
        .map_err(error_response)?;
    Ok(Json(groups))
}

pub async fn create_group<S: Store>(
    State(store): State<AppState<S>>,
    Json(payload): Json<NewGroup>,
) -> Result<(StatusCode, Json<Group>), ApiError> {
    let group = service::add_group(&*store, payload)
        .await
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn get_group<S: Store>(
    State(store): State<AppState<S>>,
    Path(group_id): Path<Id>,
) -> Result<Json<Group>, ApiError> {
    let group = service::get_group(&*store, group_id)
        .await
        .map_err(error_response)?;
    Ok(Json(group))
}

pub async fn update_group<S: Store>(
    State(store): State<AppState<S>>,
    Path(group_id): Path<Id>,
    Json(payload): Json<GroupUpdate>,
) -> Result<Json<Group>, ApiError> {
    let group = service::edit_group(&*store, group_id, payload)
        .await
        .map_err(error_response)?;
    Ok(Json(group))
}

pub async fn delete_group<S: Store>(
    State(store): State<AppState<S>>,
    Path(group_id): Path<Id>,
) -> Result<StatusCode, ApiError> {
    service::del_group(&*store, group_id)
        .await
        .map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_group_students<S: Store>(
    State(store): State<AppState<S>>,
    Path(group_id): Path<Id>,
) -> Result<Json<Vec<Student>>, ApiError> {
    let students = service::group_students(&*store, group_id)
        .await
        .map_err(error_response)?;
    Ok(Json(students))
}

pub async fn add_group_students<S: Store>(
    State(store): State<AppState<S>>,
    Path(group_id): Path<Id>,
    Json(payload): Json<StudentIdList>,
) -> Result<StatusCode, ApiError> {
    service::add_students_to_group(&*store, group_id, &payload.students)
        .await
        .map_err(error_response)?;
    Ok(StatusCode::CREATED)
}

pub async fn remove_group_students<S: Store>(
    State(store): State<AppState<S>>,
    Path(group_id): Path<Id>,
    Json(payload): Json<StudentIdList>,
) -> Result<StatusCode, ApiError> {
    service::remove_students_from_group(&*store, group_id, &payload.students)
        .await
        .map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Students
// ---------------------------------------------------------------------------

pub async fn list_students<S: Store>(
    State(store): State<AppState<S>>,
    Query(query): Query<StudentsQuery>,
) -> Result<Json<Vec<Student>>, ApiError> {
    let students = service::list_students(&*store, query.course_name)
        .await
        .map_err(error_response)?;
    Ok(Json(students))
}

pub async fn create_student<S: Store>(
    State(store): State<AppState<S>>,
    Json(payload): Json<NewStudent>,
) -> Result<(StatusCode, Json<Student>), ApiError> {
    let student = service::add_student(&*store, payload)
        .await
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(student)))
}

pub async fn get_student<S: Store>(
    State(store): State<AppState<S>>,
    Path(student_id): Path<Id>,
) -> Result<Json<Student>, ApiError> {
    let student = service::get_student(&*store, student_id)
        .await
        .map_err(error_response)?;
    Ok(Json(student))
}

pub async fn update_student<S: Store>(
    State(store): State<AppState<S>>,
    Path(student_id): Path<Id>,
    Json(payload): Json<StudentUpdate>,
) -> Result<Json<Student>, ApiError> {
    let student = service::edit_student(&*store, student_id, payload)
        .await
        .map_err(error_response)?;
    Ok(Json(student))
}

pub async fn delete_student<S: Store>(
    State(store): State<AppState<S>>,
    Path(student_id): Path<Id>,
) -> Result<StatusCode, ApiError> {
    service::del_student(&*store, student_id)
        .await
        .map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_student_courses<S: Store>(
    State(store): State<AppState<S>>,
    Path(student_id): Path<Id>,
) -> Result<Json<Vec<Course>>, ApiError> {
    let courses = service::student_courses(&*store, student_id)
        .await
        .map_err(error_response)?;
    Ok(Json(courses))
}

pub async fn add_student_courses<S: Store>(
    State(store): State<AppState<S>>,
    Path(student_id): Path<Id>,
    Json(payload): Json<CourseIdList>,
) -> Result<StatusCode, ApiError> {
    service::add_courses_to_student(&*store, student_id, &payload.courses)
        .await
        .map_err(error_response)?;
    Ok(StatusCode::CREATED)
}

pub async fn remove_student_courses<S: Store>(
    State(store): State<AppState<S>>,
    Path(student_id): Path<Id>,
    Json(payload): Json<CourseIdList>,
) -> Result<StatusCode, ApiError> {
    service::remove_courses_from_student(&*store, student_id, &payload.courses)
        .await
        .map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Courses
// ---------------------------------------------------------------------------

pub async fn list_courses<S: Store>(
    State(store): State<AppState<S>>,
) -> Result<Json<Vec<Course>>, ApiError> {
    let courses = service::list_courses(&*store)
        .await
        .map_err(error_response)?;
    Ok(Json(courses))
}

pub async fn create_course<S: Store>(
    State(store): State<AppState<S>>,
    Json(payload): Json<NewCourse>,
) -> Result<(StatusCode, Json<Course>), ApiError> {
    let course = service::add_course(&*store, payload)
        .await
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(course)))
}

pub async fn get_course<S: Store>(
    State(store): State<AppState<S>>,
    Path(course_id): Path<Id>,
) -> Result<Json<Course>, ApiError> {
    let course = service::get_course(&*store, course_id)
        .await
        .map_err(error_response)?;
    Ok(Json(course))
}

pub async fn update_course<S: Store>(
    State(store): State<AppState<S>>,
    Path(course_id): Path<Id>,
    Json(payload): Json<CourseUpdate>,
) -> Result<Json<Course>, ApiError> {
    let course = service::edit_course(&*store, course_id, payload)
        .await
        .map_err(error_response)?;
    Ok(Json(course))
}

pub async fn delete_course<S: Store>(
    State(store): State<AppState<S>>,
    Path(course_id): Path<Id>,
) -> Result<StatusCode, ApiError> {
    service::del_course(&*store, course_id)
        .await
        .map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_course_students<S: Store>(
    State(store): State<AppState<S>>,
    Path(course_id): Path<Id>,
) -> Result<Json<Vec<Student>>, ApiError> {
    let students = service::course_students(&*store, course_id)
        .await
        .map_err(error_response)?;
    Ok(Json(students))
}

pub async fn add_course_students<S: Store>(
    State(store): State<AppState<S>>,
    Path(course_id): Path<Id>,
    Json(payload): Json<StudentIdList>,
) -> Result<StatusCode, ApiError> {
    service::add_students_to_course(&*store, course_id, &payload.students)
        .await
        .map_err(error_response)?;
    Ok(StatusCode::CREATED)
}

pub async fn remove_course_students<S: Store>(
    State(store): State<AppState<S>>,
    Path(course_id): Path<Id>,
    Json(payload): Json<StudentIdList>,
) -> Result<StatusCode, ApiError> {
    service::remove_students_from_course(&*store, course_id, &payload.students)
        .await
        .map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_map_to_the_documented_status_codes() {
        let (status, _) = error_response(DomainError::not_found("group", 1));
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = error_response(DomainError::duplicate_name("course", "Math"));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = error_response(DomainError::MissingRequiredField("group_name"));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = error_response(DomainError::not_member(3, "group"));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = error_response(DomainError::Database(sqlx::Error::PoolTimedOut));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn error_body_carries_a_message() {
        let (_, Json(body)) = error_response(DomainError::not_found("student", 42));
        assert_eq!(body.message, "student with id=42 does not exist");
    }
}
