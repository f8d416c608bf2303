use crate::model::common::{double_option, Id};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: Id,
    pub first_name: String,
    pub last_name: String,
    /// A student belongs to at most one group at a time.
    pub group_id: Option<Id>,
    /// Ids of the courses the student is enrolled in.
    pub courses: Vec<Id>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewStudent {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub group_id: Option<Id>,
}

/// Partial update for PUT /students/{id}. Only fields present in the request
/// body are applied. `group_id` uses a presence marker so that an explicit
/// `"group_id": null` clears the group while an absent key leaves it alone.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StudentUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub group_id: Option<Option<Id>>,
}
