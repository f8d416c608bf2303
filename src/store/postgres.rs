use anyhow::{Context, Result};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row};
use std::collections::HashSet;

use crate::error::DomainError;
use crate::model::{Course, CourseUpdate, Group, Id, Student, StudentUpdate};
use crate::store::traits::{CourseStore, GroupStore, MembershipStore, Store, StudentStore};

/// Base SELECTs hydrate each entity with its relationship ids via
/// array_agg, so a single row carries the full wire shape.
const GROUP_SELECT: &str = "SELECT g.id, g.name, \
     array_remove(array_agg(s.id ORDER BY s.id), NULL) AS students \
     FROM groups g LEFT JOIN students s ON s.group_id = g.id";

const STUDENT_SELECT: &str = "SELECT st.id, st.first_name, st.last_name, st.group_id, \
     array_remove(array_agg(sc.course_id ORDER BY sc.course_id), NULL) AS courses \
     FROM students st LEFT JOIN student_courses sc ON sc.student_id = st.id";

const COURSE_SELECT: &str = "SELECT c.id, c.name, c.description, \
     array_remove(array_agg(sc.student_id ORDER BY sc.student_id), NULL) AS students \
     FROM courses c LEFT JOIN student_courses sc ON sc.course_id = c.id";

const SCHEMA_DDL: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS groups (\
        id BIGSERIAL PRIMARY KEY,\
        name TEXT NOT NULL UNIQUE\
    )",
    "CREATE TABLE IF NOT EXISTS students (\
        id BIGSERIAL PRIMARY KEY,\
        first_name TEXT NOT NULL,\
        last_name TEXT NOT NULL,\
        group_id BIGINT REFERENCES groups(id) ON DELETE SET NULL\
    )",
    "CREATE TABLE IF NOT EXISTS courses (\
        id BIGSERIAL PRIMARY KEY,\
        name TEXT NOT NULL UNIQUE,\
        description TEXT\
    )",
    // Composite primary key: a (student_id, course_id) pair cannot repeat.
    "CREATE TABLE IF NOT EXISTS student_courses (\
        student_id BIGINT NOT NULL REFERENCES students(id) ON DELETE CASCADE,\
        course_id BIGINT NOT NULL REFERENCES courses(id) ON DELETE CASCADE,\
        PRIMARY KEY (student_id, course_id)\
    )",
];

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the three entity tables and the join table if they are
    /// missing. Safe to call on every startup.
    pub async fn create_schema(&self) -> Result<()> {
        for statement in SCHEMA_DDL {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("Failed to create schema")?;
        }
        Ok(())
    }

    pub async fn drop_schema(&self) -> Result<()> {
        sqlx::query("DROP TABLE IF EXISTS student_courses, students, courses, groups CASCADE")
            .execute(&self.pool)
            .await
            .context("Failed to drop schema")?;
        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23503"))
}

fn group_from_row(row: &PgRow) -> Group {
    Group {
        id: row.get("id"),
        name: row.get("name"),
        students: row.get("students"),
    }
}

fn student_from_row(row: &PgRow) -> Student {
    Student {
        id: row.get("id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        group_id: row.get("group_id"),
        courses: row.get("courses"),
    }
}

fn course_from_row(row: &PgRow) -> Course {
    Course {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        students: row.get("students"),
    }
}

async fn fetch_group<'a, E>(executor: E, id: Id) -> std::result::Result<Option<Group>, sqlx::Error>
where
    E: sqlx::Executor<'a, Database = Postgres>,
{
    let row = sqlx::query(&format!("{} WHERE g.id = $1 GROUP BY g.id", GROUP_SELECT))
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(row.as_ref().map(group_from_row))
}

async fn fetch_student<'a, E>(
    executor: E,
    id: Id,
) -> std::result::Result<Option<Student>, sqlx::Error>
where
    E: sqlx::Executor<'a, Database = Postgres>,
{
    let row = sqlx::query(&format!(
        "{} WHERE st.id = $1 GROUP BY st.id",
        STUDENT_SELECT
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;
    Ok(row.as_ref().map(student_from_row))
}

async fn fetch_course<'a, E>(
    executor: E,
    id: Id,
) -> std::result::Result<Option<Course>, sqlx::Error>
where
    E: sqlx::Executor<'a, Database = Postgres>,
{
    let row = sqlx::query(&format!("{} WHERE c.id = $1 GROUP BY c.id", COURSE_SELECT))
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(row.as_ref().map(course_from_row))
}

/// Fails NotFound when the id has no row behind it.
async fn ensure_row<'a, E>(
    executor: E,
    sql: &str,
    entity: &'static str,
    id: Id,
) -> std::result::Result<(), DomainError>
where
    E: sqlx::Executor<'a, Database = Postgres>,
{
    let row = sqlx::query(sql).bind(id).fetch_optional(executor).await?;
    if row.is_none() {
        return Err(DomainError::not_found(entity, id));
    }
    Ok(())
}

/// Batch existence check; reports the first missing id as NotFound.
async fn ensure_all_exist<'a, E>(
    executor: E,
    table_sql: &str,
    entity: &'static str,
    ids: &[Id],
) -> std::result::Result<(), DomainError>
where
    E: sqlx::Executor<'a, Database = Postgres>,
{
    let rows = sqlx::query(table_sql).bind(ids).fetch_all(executor).await?;
    let existing: HashSet<Id> = rows.iter().map(|row| row.get("id")).collect();
    for &id in ids {
        if !existing.contains(&id) {
            return Err(DomainError::not_found(entity, id));
        }
    }
    Ok(())
}

#[async_trait::async_trait]
impl GroupStore for PostgresStore {
    async fn get_group(&self, id: Id) -> std::result::Result<Option<Group>, DomainError> {
        Ok(fetch_group(&self.pool, id).await?)
    }

    async fn list_groups(
        &self,
        max_students: Option<i64>,
    ) -> std::result::Result<Vec<Group>, DomainError> {
        let rows = match max_students {
            // count(s.id) ignores the NULL produced by the outer join, so
            // empty groups count as zero and pass the filter.
            Some(max) => {
                sqlx::query(&format!(
                    "{} GROUP BY g.id HAVING count(s.id) <= $1 ORDER BY g.id",
                    GROUP_SELECT
                ))
                .bind(max)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!("{} GROUP BY g.id ORDER BY g.id", GROUP_SELECT))
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(rows.iter().map(group_from_row).collect())
    }

    async fn insert_group(&self, name: &str) -> std::result::Result<Group, DomainError> {
        let row = sqlx::query("INSERT INTO groups (name) VALUES ($1) RETURNING id, name")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DomainError::duplicate_name("group", name)
                } else {
                    e.into()
                }
            })?;
        Ok(Group {
            id: row.get("id"),
            name: row.get("name"),
            students: Vec::new(),
        })
    }

    async fn update_group(&self, id: Id, name: &str) -> std::result::Result<Group, DomainError> {
        let mut tx = self.pool.begin().await?;
        // No read-before-write uniqueness pre-check: the UNIQUE constraint
        // is the arbiter, so concurrent renames cannot both commit.
        let updated = sqlx::query("UPDATE groups SET name = $2 WHERE id = $1")
            .bind(id)
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DomainError::duplicate_name("group", name)
                } else {
                    e.into()
                }
            })?;
        if updated.rows_affected() == 0 {
            return Err(DomainError::not_found("group", id));
        }
        let group = fetch_group(&mut *tx, id)
            .await?
            .ok_or_else(|| DomainError::not_found("group", id))?;
        tx.commit().await?;
        Ok(group)
    }

    async fn delete_group(&self, id: Id) -> std::result::Result<bool, DomainError> {
        // Members' group_id is nulled by ON DELETE SET NULL.
        let result = sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_group_members(
        &self,
        group_id: Id,
    ) -> std::result::Result<Vec<Student>, DomainError> {
        ensure_row(
            &self.pool,
            "SELECT id FROM groups WHERE id = $1",
            "group",
            group_id,
        )
        .await?;
        let rows = sqlx::query(&format!(
            "{} WHERE st.group_id = $1 GROUP BY st.id ORDER BY st.id",
            STUDENT_SELECT
        ))
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(student_from_row).collect())
    }

    async fn assign_students_to_group(
        &self,
        group_id: Id,
        student_ids: &[Id],
    ) -> std::result::Result<(), DomainError> {
        let mut tx = self.pool.begin().await?;
        ensure_row(
            &mut *tx,
            "SELECT id FROM groups WHERE id = $1",
            "group",
            group_id,
        )
        .await?;
        ensure_all_exist(
            &mut *tx,
            "SELECT id FROM students WHERE id = ANY($1)",
            "student",
            student_ids,
        )
        .await?;
        sqlx::query("UPDATE students SET group_id = $1 WHERE id = ANY($2)")
            .bind(group_id)
            .bind(student_ids)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn unassign_students_from_group(
        &self,
        group_id: Id,
        student_ids: &[Id],
    ) -> std::result::Result<(), DomainError> {
        let mut tx = self.pool.begin().await?;
        ensure_row(
            &mut *tx,
            "SELECT id FROM groups WHERE id = $1",
            "group",
            group_id,
        )
        .await?;
        for &student_id in student_ids {
            let result =
                sqlx::query("UPDATE students SET group_id = NULL WHERE id = $1 AND group_id = $2")
                    .bind(student_id)
                    .bind(group_id)
                    .execute(&mut *tx)
                    .await?;
            if result.rows_affected() == 0 {
                // Either the student is unknown or simply not in this group;
                // the transaction is dropped unchanged in both cases.
                ensure_row(
                    &mut *tx,
                    "SELECT id FROM students WHERE id = $1",
                    "student",
                    student_id,
                )
                .await?;
                return Err(DomainError::not_member(student_id, "group"));
            }
        }
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl StudentStore for PostgresStore {
    async fn get_student(&self, id: Id) -> std::result::Result<Option<Student>, DomainError> {
        Ok(fetch_student(&self.pool, id).await?)
    }

    async fn list_students(&self) -> std::result::Result<Vec<Student>, DomainError> {
        let rows = sqlx::query(&format!("{} GROUP BY st.id ORDER BY st.id", STUDENT_SELECT))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(student_from_row).collect())
    }

    async fn insert_student(
        &self,
        first_name: &str,
        last_name: &str,
        group_id: Option<Id>,
    ) -> std::result::Result<Student, DomainError> {
        let row = sqlx::query(
            "INSERT INTO students (first_name, last_name, group_id) VALUES ($1, $2, $3) \
             RETURNING id, first_name, last_name, group_id",
        )
        .bind(first_name)
        .bind(last_name)
        .bind(group_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match (is_foreign_key_violation(&e), group_id) {
            (true, Some(gid)) => DomainError::not_found("group", gid),
            _ => e.into(),
        })?;
        Ok(Student {
            id: row.get("id"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            group_id: row.get("group_id"),
            courses: Vec::new(),
        })
    }

    async fn update_student(
        &self,
        id: Id,
        update: StudentUpdate,
    ) -> std::result::Result<Student, DomainError> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(
            "SELECT first_name, last_name, group_id FROM students WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            return Err(DomainError::not_found("student", id));
        };

        // Absent fields keep their stored value; group_id's presence marker
        // distinguishes "clear" from "leave alone".
        let first_name = update.first_name.unwrap_or_else(|| row.get("first_name"));
        let last_name = update.last_name.unwrap_or_else(|| row.get("last_name"));
        let group_id: Option<Id> = match update.group_id {
            Some(value) => value,
            None => row.get("group_id"),
        };

        sqlx::query("UPDATE students SET first_name = $2, last_name = $3, group_id = $4 WHERE id = $1")
            .bind(id)
            .bind(&first_name)
            .bind(&last_name)
            .bind(group_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| match (is_foreign_key_violation(&e), group_id) {
                (true, Some(gid)) => DomainError::not_found("group", gid),
                _ => e.into(),
            })?;

        let student = fetch_student(&mut *tx, id)
            .await?
            .ok_or_else(|| DomainError::not_found("student", id))?;
        tx.commit().await?;
        Ok(student)
    }

    async fn delete_student(&self, id: Id) -> std::result::Result<bool, DomainError> {
        // Join rows go with the student via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM students WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl CourseStore for PostgresStore {
    async fn get_course(&self, id: Id) -> std::result::Result<Option<Course>, DomainError> {
        Ok(fetch_course(&self.pool, id).await?)
    }

    async fn list_courses(&self) -> std::result::Result<Vec<Course>, DomainError> {
        let rows = sqlx::query(&format!("{} GROUP BY c.id ORDER BY c.id", COURSE_SELECT))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(course_from_row).collect())
    }

    async fn insert_course(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> std::result::Result<Course, DomainError> {
        let row = sqlx::query(
            "INSERT INTO courses (name, description) VALUES ($1, $2) \
             RETURNING id, name, description",
        )
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DomainError::duplicate_name("course", name)
            } else {
                e.into()
            }
        })?;
        Ok(Course {
            id: row.get("id"),
            name: row.get("name"),
            description: row.get("description"),
            students: Vec::new(),
        })
    }

    async fn update_course(
        &self,
        id: Id,
        update: CourseUpdate,
    ) -> std::result::Result<Course, DomainError> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("SELECT name, description FROM courses WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Err(DomainError::not_found("course", id));
        };

        let name = update.course_name.unwrap_or_else(|| row.get("name"));
        let description: Option<String> = match update.description {
            Some(value) => value,
            None => row.get("description"),
        };

        sqlx::query("UPDATE courses SET name = $2, description = $3 WHERE id = $1")
            .bind(id)
            .bind(&name)
            .bind(&description)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DomainError::duplicate_name("course", name.clone())
                } else {
                    e.into()
                }
            })?;

        let course = fetch_course(&mut *tx, id)
            .await?
            .ok_or_else(|| DomainError::not_found("course", id))?;
        tx.commit().await?;
        Ok(course)
    }

    async fn delete_course(&self, id: Id) -> std::result::Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl MembershipStore for PostgresStore {
    async fn add_course_members(
        &self,
        course_id: Id,
        student_ids: &[Id],
    ) -> std::result::Result<(), DomainError> {
        let mut tx = self.pool.begin().await?;
        ensure_row(
            &mut *tx,
            "SELECT id FROM courses WHERE id = $1",
            "course",
            course_id,
        )
        .await?;
        ensure_all_exist(
            &mut *tx,
            "SELECT id FROM students WHERE id = ANY($1)",
            "student",
            student_ids,
        )
        .await?;
        // Set semantics: a pair that already exists is left alone.
        sqlx::query(
            "INSERT INTO student_courses (student_id, course_id) \
             SELECT unnest($1::bigint[]), $2 ON CONFLICT DO NOTHING",
        )
        .bind(student_ids)
        .bind(course_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn remove_course_members(
        &self,
        course_id: Id,
        student_ids: &[Id],
    ) -> std::result::Result<(), DomainError> {
        let mut tx = self.pool.begin().await?;
        ensure_row(
            &mut *tx,
            "SELECT id FROM courses WHERE id = $1",
            "course",
            course_id,
        )
        .await?;
        for &student_id in student_ids {
            ensure_row(
                &mut *tx,
                "SELECT id FROM students WHERE id = $1",
                "student",
                student_id,
            )
            .await?;
            let result =
                sqlx::query("DELETE FROM student_courses WHERE student_id = $1 AND course_id = $2")
                    .bind(student_id)
                    .bind(course_id)
                    .execute(&mut *tx)
                    .await?;
            if result.rows_affected() == 0 {
                return Err(DomainError::not_member(student_id, "course"));
            }
        }
        tx.commit().await?;
        Ok(())
    }

    async fn add_student_courses(
        &self,
        student_id: Id,
        course_ids: &[Id],
    ) -> std::result::Result<(), DomainError> {
        let mut tx = self.pool.begin().await?;
        ensure_row(
            &mut *tx,
            "SELECT id FROM students WHERE id = $1",
            "student",
            student_id,
        )
        .await?;
        ensure_all_exist(
            &mut *tx,
            "SELECT id FROM courses WHERE id = ANY($1)",
            "course",
            course_ids,
        )
        .await?;
        sqlx::query(
            "INSERT INTO student_courses (student_id, course_id) \
             SELECT $1, unnest($2::bigint[]) ON CONFLICT DO NOTHING",
        )
        .bind(student_id)
        .bind(course_ids)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn remove_student_courses(
        &self,
        student_id: Id,
        course_ids: &[Id],
    ) -> std::result::Result<(), DomainError> {
        let mut tx = self.pool.begin().await?;
        ensure_row(
            &mut *tx,
            "SELECT id FROM students WHERE id = $1",
            "student",
            student_id,
        )
        .await?;
        for &course_id in course_ids {
            ensure_row(
                &mut *tx,
                "SELECT id FROM courses WHERE id = $1",
                "course",
                course_id,
            )
            .await?;
            let result =
                sqlx::query("DELETE FROM student_courses WHERE student_id = $1 AND course_id = $2")
                    .bind(student_id)
                    .bind(course_id)
                    .execute(&mut *tx)
                    .await?;
            if result.rows_affected() == 0 {
                return Err(DomainError::not_member(student_id, "course"));
            }
        }
        tx.commit().await?;
        Ok(())
    }

    async fn list_course_members(
        &self,
        course_id: Id,
    ) -> std::result::Result<Vec<Student>, DomainError> {
        ensure_row(
            &self.pool,
            "SELECT id FROM courses WHERE id = $1",
            "course",
            course_id,
        )
        .await?;
        let rows = sqlx::query(&format!(
            "{} WHERE st.id IN (SELECT student_id FROM student_courses WHERE course_id = $1) \
             GROUP BY st.id ORDER BY st.id",
            STUDENT_SELECT
        ))
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(student_from_row).collect())
    }

    async fn list_student_courses(
        &self,
        student_id: Id,
    ) -> std::result::Result<Vec<Course>, DomainError> {
        ensure_row(
            &self.pool,
            "SELECT id FROM students WHERE id = $1",
            "student",
            student_id,
        )
        .await?;
        let rows = sqlx::query(&format!(
            "{} WHERE c.id IN (SELECT course_id FROM student_courses WHERE student_id = $1) \
             GROUP BY c.id ORDER BY c.id",
            COURSE_SELECT
        ))
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(course_from_row).collect())
    }

    async fn list_students_on_course_named(
        &self,
        course_name: &str,
    ) -> std::result::Result<Vec<Student>, DomainError> {
        let rows = sqlx::query(&format!(
            "{} WHERE st.id IN (\
                SELECT sc2.student_id FROM student_courses sc2 \
                JOIN courses c ON c.id = sc2.course_id WHERE c.name = $1) \
             GROUP BY st.id ORDER BY st.id",
            STUDENT_SELECT
        ))
        .bind(course_name)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(student_from_row).collect())
    }
}

impl Store for PostgresStore {}
