use thiserror::Error;

/// Failures a pantry operation reports back to whoever submitted the form.
///
/// None of these are fatal: the submission is rejected, nothing is written,
/// and the message is meant to be shown to staff as-is.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PantryError {
    #[error("invalid quantity: '{0}' (use a number like 2, 2.5 or 3/4)")]
    InvalidQuantity(String),

    #[error("zero denominator in '{0}'")]
    ZeroDenominator(String),

    #[error("products left ({remaining}) exceed products distributed ({distributed})")]
    ExceedsDistributed { remaining: f64, distributed: f64 },

    #[error("please fill out all fields, missing: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("invalid count method: '{0}' (expected Individual or Crates)")]
    InvalidCountMethod(String),

    #[error("invalid reconcile policy: '{0}' (expected bounded or overwrite)")]
    InvalidPolicy(String),

    #[error("write access denied")]
    AccessDenied,
}
