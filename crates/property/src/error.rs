use propkit_common::{ParseValueError, ValueKind};

/// Errors raised while binding a control to a property.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ControlError {
    #[error("property `{0}` requires a value but has none")]
    InvalidProperty(String),
    #[error("property `{property}` is declared {declared} but its accessor yields {found}")]
    KindMismatch {
        property: String,
        declared: ValueKind,
        found: ValueKind,
    },
    #[error("property `{property}` holds `{value}`, which is not one of its variants")]
    EnumDomainViolation { property: String, value: String },
    #[error("enum property `{0}` declares no variants")]
    MissingDomain(String),
}

/// Input rejected by a control before any operation is created.
///
/// The widget reverts to the last synchronized value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error(transparent)]
    Parse(#[from] ParseValueError),
    #[error("expected a {expected} value, got {found}")]
    WrongKind { expected: ValueKind, found: ValueKind },
    #[error("`{value}` is not a valid choice for `{property}`")]
    OutOfDomain { property: String, value: String },
    #[error("property `{0}` requires a value")]
    Required(String),
    #[error("value is not a finite number")]
    NotFinite,
    #[error("property `{0}` is read-only")]
    ReadOnly(String),
}
