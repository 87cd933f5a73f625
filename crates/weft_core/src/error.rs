use thiserror::Error;

/// Errors surfaced by the runtime core.
///
/// Programmer bugs (a data slot changing type across traversals, a named
/// block visited out of order while garbage collection is disabled) are not
/// represented here; those are hard failures and panic with a diagnostic.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A dynamically-checked context component was requested but not
    /// provided by any enclosing scope.
    #[error("component not found in context: {0}")]
    ComponentNotFound(&'static str),
}
