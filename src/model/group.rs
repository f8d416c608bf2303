use crate::model::common::Id;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: Id,
    pub name: String,
    /// Ids of the students currently assigned to this group.
    pub students: Vec<Id>,
}

/// Input model for creating a group. `group_name` is optional on the wire so
/// that its absence can be reported as a 400 instead of a body-rejection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewGroup {
    pub group_name: Option<String>,
}

/// Rename payload for PUT /groups/{id}.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GroupUpdate {
    pub group_name: Option<String>,
}
