use crate::model::Id;

/// Domain failures surfaced by the store and service layers. The HTTP
/// mapping lives in the API layer; everything here is transport-agnostic.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("{entity} with id={id} does not exist")]
    NotFound { entity: &'static str, id: Id },

    #[error("{entity} with name {name} already exist")]
    DuplicateName { entity: &'static str, name: String },

    #[error("{0} is required")]
    MissingRequiredField(&'static str),

    #[error("student with id={student_id} is not in the {scope}")]
    NotMember { student_id: Id, scope: &'static str },

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: Id) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn duplicate_name(entity: &'static str, name: impl Into<String>) -> Self {
        Self::DuplicateName {
            entity,
            name: name.into(),
        }
    }

    pub fn not_member(student_id: Id, scope: &'static str) -> Self {
        Self::NotMember { student_id, scope }
    }
}
