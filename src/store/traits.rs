use crate::error::DomainError;
use crate::model::{Course, CourseUpdate, Group, Id, Student, StudentUpdate};

type Result<T> = std::result::Result<T, DomainError>;

/// Group rows plus the one-to-many Group→Student relationship. Every
/// mutating method is one atomic unit: either all of its statements commit
/// or none do.
#[async_trait::async_trait]
pub trait GroupStore: Send + Sync {
    async fn get_group(&self, id: Id) -> Result<Option<Group>>;
    /// With `max_students`, returns only groups whose member count is <= the
    /// bound; zero-member groups are included.
    async fn list_groups(&self, max_students: Option<i64>) -> Result<Vec<Group>>;
    async fn insert_group(&self, name: &str) -> Result<Group>;
    async fn update_group(&self, id: Id, name: &str) -> Result<Group>;
    /// Returns false when the row did not exist. Members keep their student
    /// rows; their group_id is nulled out at the store level.
    async fn delete_group(&self, id: Id) -> Result<bool>;

    /// Fails NotFound if the group is absent.
    async fn list_group_members(&self, group_id: Id) -> Result<Vec<Student>>;
    /// NotFound for the group or for any student id in the batch; the whole
    /// batch aborts in that case. Re-adding a current member is a no-op.
    async fn assign_students_to_group(&self, group_id: Id, student_ids: &[Id]) -> Result<()>;
    /// NotMember when a student exists but is not in this group.
    async fn unassign_students_from_group(&self, group_id: Id, student_ids: &[Id]) -> Result<()>;
}

#[async_trait::async_trait]
pub trait StudentStore: Send + Sync {
    async fn get_student(&self, id: Id) -> Result<Option<Student>>;
    async fn list_students(&self) -> Result<Vec<Student>>;
    /// An invalid `group_id` fails NotFound; the student row is not created.
    async fn insert_student(
        &self,
        first_name: &str,
        last_name: &str,
        group_id: Option<Id>,
    ) -> Result<Student>;
    async fn update_student(&self, id: Id, update: StudentUpdate) -> Result<Student>;
    /// Course memberships disappear with the row (store-level cascade).
    async fn delete_student(&self, id: Id) -> Result<bool>;
}

#[async_trait::async_trait]
pub trait CourseStore: Send + Sync {
    async fn get_course(&self, id: Id) -> Result<Option<Course>>;
    async fn list_courses(&self) -> Result<Vec<Course>>;
    async fn insert_course(&self, name: &str, description: Option<&str>) -> Result<Course>;
    async fn update_course(&self, id: Id, update: CourseUpdate) -> Result<Course>;
    async fn delete_course(&self, id: Id) -> Result<bool>;
}

/// The Student↔Course join table as an explicit repository. The
/// (student_id, course_id) pair is unique at the store level; adding an
/// existing pair is a no-op, removing an absent pair signals NotMember.
#[async_trait::async_trait]
pub trait MembershipStore: Send + Sync {
    async fn add_course_members(&self, course_id: Id, student_ids: &[Id]) -> Result<()>;
    async fn remove_course_members(&self, course_id: Id, student_ids: &[Id]) -> Result<()>;
    async fn add_student_courses(&self, student_id: Id, course_ids: &[Id]) -> Result<()>;
    async fn remove_student_courses(&self, student_id: Id, course_ids: &[Id]) -> Result<()>;

    async fn list_course_members(&self, course_id: Id) -> Result<Vec<Student>>;
    async fn list_student_courses(&self, student_id: Id) -> Result<Vec<Course>>;
    /// Empty result (not an error) when no course carries the name.
    async fn list_students_on_course_named(&self, course_name: &str) -> Result<Vec<Student>>;
}

pub trait Store: GroupStore + StudentStore + CourseStore + MembershipStore + Send + Sync {}
