use serde::{Deserialize, Deserializer};

/// Server-generated primary key (Postgres BIGSERIAL).
pub type Id = i64;

/// Deserializes a field into `Option<Option<T>>` so that an absent key and
/// an explicit JSON `null` can be told apart on partial updates:
/// absent => `None` (leave the field alone), `null` => `Some(None)` (clear
/// it), value => `Some(Some(v))`. Must be combined with `#[serde(default)]`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Bulk membership payload for the `/students` relationship endpoints.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StudentIdList {
    pub students: Vec<Id>,
}

/// Bulk membership payload for the `/courses` relationship endpoints.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CourseIdList {
    pub courses: Vec<Id>,
}
