use crate::ecs::{ComponentKind, EntityId};
use thiserror::Error;

/// Setup-time failures. Fatal: initialization aborts instead of continuing
/// with partial state.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("entity '{entity}' already has a '{kind}' component")]
    DuplicateComponent { entity: String, kind: ComponentKind },

    #[error("entity '{entity}' is already initialized")]
    AlreadyInitialized { entity: String },

    #[error("an entity named '{name}' is already registered")]
    DuplicateEntity { name: String },

    #[error("state '{name}' is already registered")]
    DuplicateState { name: String },

    #[error("invalid '{field}' for {component}: {reason}")]
    InvalidParameter {
        component: &'static str,
        field: &'static str,
        reason: String,
    },

    #[error("malformed parameters for {component}")]
    MalformedParameters {
        component: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid spatial grid: {reason}")]
    InvalidGrid { reason: String },
}

/// Something asked for was not there. Recoverable: callers treat it as
/// "absent" and fall back to a default.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("unknown state '{name}'")]
    UnknownState { name: String },

    #[error("no entity named '{name}'")]
    UnknownEntity { name: String },

    #[error("entity {id} is no longer alive")]
    StaleEntity { id: EntityId },
}

/// Failure inside one entity's frame. The manager logs these and keeps
/// sweeping the remaining entities.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("'{component}' on '{entity}' requires a '{kind}' sibling")]
    MissingSibling {
        entity: String,
        component: ComponentKind,
        kind: ComponentKind,
    },

    #[error("message chain on '{entity}' exceeded {limit} deliveries")]
    DispatchOverflow { entity: String, limit: usize },
}
