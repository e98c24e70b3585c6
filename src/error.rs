#[derive(Debug, thiserror::Error)]
pub enum TyperError {
    #[error("Function {0} has no return")]
    MissingReturn(String),

    #[error("Function {0} has multiple return execute_command")]
    AmbiguousCommand(String),

    #[error("Function {0} has no literal execute_command name")]
    NonLiteralCommand(String),

    #[error("Cannot find {0} in official redis docs")]
    NotDocumented(String),

    #[error("Couldn't find response HEADER for Function: {0} in DOCS")]
    NoReplySection(String),

    #[error("Couldn't find below element for {function} with id {marker}")]
    MissingSibling { function: String, marker: String },

    #[error("Couldn't find next UL element for Function: {0}")]
    MissingList(String),

    #[error("Operator declined the reply section of {0}")]
    Declined(String),

    #[error("No reply type resolved for {0}")]
    Unresolved(String),

    #[error("Function {0} has only unrecognized reply types")]
    OnlyUnrecognized(String),
}

impl TyperError {
    /// Errors that abort the whole run instead of marking one function.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TyperError::NoReplySection(_))
    }
}
