//! Error taxonomy shared by every impactree operation.

/// Classified failure of an impactree operation.
///
/// Everything the HTTP layer needs to pick a status code is carried by the
/// variant. Store and I/O failures arrive as [`ImpactError::Internal`].
#[derive(Debug, thiserror::Error)]
pub enum ImpactError {
    /// A required field is missing or a value is out of range.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// The caller is authenticated but lacks the privilege.
    #[error("{0}")]
    Forbidden(String),

    #[error("Authentication credentials were not provided or are invalid")]
    Unauthorized,

    #[error("User already has an impact plan.")]
    DuplicatePlan,

    #[error("This charity is already in the impact plan")]
    DuplicateAllocation,

    /// A field that a partial update cannot do without.
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Cannot change the user associated with an impact plan.")]
    ImmutableOwner,

    #[error("No impact plan found for this user")]
    NoPlanForUser,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ImpactError {
    pub fn not_found(entity: &str, id: i64) -> Self {
        Self::NotFound(format!("{entity} {id} not found"))
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }
}

pub type Result<T, E = ImpactError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_entity() {
        let err = ImpactError::not_found("charity", 42);
        assert_eq!(err.to_string(), "charity 42 not found");
    }

    #[test]
    fn missing_field_message() {
        let err = ImpactError::MissingField("allocation_amount");
        assert_eq!(err.to_string(), "allocation_amount is required");
    }

    #[test]
    fn internal_is_transparent() {
        let err: ImpactError = anyhow::anyhow!("connection reset").into();
        assert_eq!(err.to_string(), "connection reset");
    }
}
