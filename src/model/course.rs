use crate::model::common::{double_option, Id};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: Id,
    pub name: String,
    pub description: Option<String>,
    /// Ids of the students enrolled in this course.
    pub students: Vec<Id>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewCourse {
    pub course_name: Option<String>,
    pub description: Option<String>,
}

/// Partial update for PUT /courses/{id}. `description` uses a presence
/// marker: an explicit `null` clears it, an absent key leaves it alone.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CourseUpdate {
    pub course_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}
