//! The relationship service: one function per domain operation. Each call
//! maps to a single atomic store operation; required-field validation
//! happens here, uniqueness and referential integrity at the store level.

use crate::error::DomainError;
use crate::model::{
    Course, CourseUpdate, Group, GroupUpdate, Id, NewCourse, NewGroup, NewStudent, Student,
    StudentUpdate,
};
use crate::store::Store;

type Result<T> = std::result::Result<T, DomainError>;

fn required(value: Option<String>, field: &'static str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(DomainError::MissingRequiredField(field)),
    }
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

pub async fn add_group<S: Store + ?Sized>(store: &S, new: NewGroup) -> Result<Group> {
    let name = required(new.group_name, "group_name")?;
    store.insert_group(&name).await
}

pub async fn edit_group<S: Store + ?Sized>(store: &S, id: Id, update: GroupUpdate) -> Result<Group> {
    let name = required(update.group_name, "group_name")?;
    store.update_group(id, &name).await
}

pub async fn del_group<S: Store + ?Sized>(store: &S, id: Id) -> Result<()> {
    if !store.delete_group(id).await? {
        return Err(DomainError::not_found("group", id));
    }
    Ok(())
}

pub async fn get_group<S: Store + ?Sized>(store: &S, id: Id) -> Result<Group> {
    store
        .get_group(id)
        .await?
        .ok_or_else(|| DomainError::not_found("group", id))
}

pub async fn list_groups<S: Store + ?Sized>(
    store: &S,
    max_students: Option<i64>,
) -> Result<Vec<Group>> {
    match max_students {
        Some(max) => select_group_with_less_students(store, max).await,
        None => store.list_groups(None).await,
    }
}

/// Groups whose member count is <= max; zero-member groups included.
pub async fn select_group_with_less_students<S: Store + ?Sized>(
    store: &S,
    max_students: i64,
) -> Result<Vec<Group>> {
    store.list_groups(Some(max_students)).await
}

pub async fn group_students<S: Store + ?Sized>(store: &S, group_id: Id) -> Result<Vec<Student>> {
    store.list_group_members(group_id).await
}

pub async fn add_students_to_group<S: Store + ?Sized>(
    store: &S,
    group_id: Id,
    student_ids: &[Id],
) -> Result<()> {
    store.assign_students_to_group(group_id, student_ids).await
}

pub async fn remove_students_from_group<S: Store + ?Sized>(
    store: &S,
    group_id: Id,
    student_ids: &[Id],
) -> Result<()> {
    store
        .unassign_students_from_group(group_id, student_ids)
        .await
}

pub async fn add_student_to_group<S: Store + ?Sized>(
    store: &S,
    student_id: Id,
    group_id: Id,
) -> Result<Group> {
    store
        .assign_students_to_group(group_id, &[student_id])
        .await?;
    get_group(store, group_id).await
}

pub async fn remove_student_from_group<S: Store + ?Sized>(
    store: &S,
    student_id: Id,
    group_id: Id,
) -> Result<Group> {
    store
        .unassign_students_from_group(group_id, &[student_id])
        .await?;
    get_group(store, group_id).await
}

// ---------------------------------------------------------------------------
// Students
// ---------------------------------------------------------------------------

pub async fn add_student<S: Store + ?Sized>(store: &S, new: NewStudent) -> Result<Student> {
    let first_name = required(new.first_name, "first_name")?;
    let last_name = required(new.last_name, "last_name")?;
    store
        .insert_student(&first_name, &last_name, new.group_id)
        .await
}

pub async fn edit_student<S: Store + ?Sized>(
    store: &S,
    id: Id,
    update: StudentUpdate,
) -> Result<Student> {
    store.update_student(id, update).await
}

pub async fn del_student<S: Store + ?Sized>(store: &S, id: Id) -> Result<()> {
    if !store.delete_student(id).await? {
        return Err(DomainError::not_found("student", id));
    }
    Ok(())
}

pub async fn get_student<S: Store + ?Sized>(store: &S, id: Id) -> Result<Student> {
    store
        .get_student(id)
        .await?
        .ok_or_else(|| DomainError::not_found("student", id))
}

pub async fn list_students<S: Store + ?Sized>(
    store: &S,
    course_name: Option<String>,
) -> Result<Vec<Student>> {
    match course_name {
        Some(name) => select_students_on_course_by_name(store, &name).await,
        None => store.list_students().await,
    }
}

/// Empty result (not an error) when no course carries the name.
pub async fn select_students_on_course_by_name<S: Store + ?Sized>(
    store: &S,
    course_name: &str,
) -> Result<Vec<Student>> {
    store.list_students_on_course_named(course_name).await
}

pub async fn student_courses<S: Store + ?Sized>(store: &S, student_id: Id) -> Result<Vec<Course>> {
    store.list_student_courses(student_id).await
}

pub async fn add_courses_to_student<S: Store + ?Sized>(
    store: &S,
    student_id: Id,
    course_ids: &[Id],
) -> Result<()> {
    store.add_student_courses(student_id, course_ids).await
}

pub async fn remove_courses_from_student<S: Store + ?Sized>(
    store: &S,
    student_id: Id,
    course_ids: &[Id],
) -> Result<()> {
    store.remove_student_courses(student_id, course_ids).await
}

// ---------------------------------------------------------------------------
// Courses
// ---------------------------------------------------------------------------

pub async fn add_course<S: Store + ?Sized>(store: &S, new: NewCourse) -> Result<Course> {
    let name = required(new.course_name, "course_name")?;
    store.insert_course(&name, new.description.as_deref()).await
}

pub async fn edit_course<S: Store + ?Sized>(
    store: &S,
    id: Id,
    update: CourseUpdate,
) -> Result<Course> {
    store.update_course(id, update).await
}

pub async fn del_course<S: Store + ?Sized>(store: &S, id: Id) -> Result<()> {
    if !store.delete_course(id).await? {
        return Err(DomainError::not_found("course", id));
    }
    Ok(())
}

pub async fn get_course<S: Store + ?Sized>(store: &S, id: Id) -> Result<Course> {
    store
        .get_course(id)
        .await?
        .ok_or_else(|| DomainError::not_found("course", id))
}

pub async fn list_courses<S: Store + ?Sized>(store: &S) -> Result<Vec<Course>> {
    store.list_courses().await
}

pub async fn course_students<S: Store + ?Sized>(store: &S, course_id: Id) -> Result<Vec<Student>> {
    store.list_course_members(course_id).await
}

pub async fn add_students_to_course<S: Store + ?Sized>(
    store: &S,
    course_id: Id,
    student_ids: &[Id],
) -> Result<()> {
    store.add_course_members(course_id, student_ids).await
}

pub async fn remove_students_from_course<S: Store + ?Sized>(
    store: &S,
    course_id: Id,
    student_ids: &[Id],
) -> Result<()> {
    store.remove_course_members(course_id, student_ids).await
}
