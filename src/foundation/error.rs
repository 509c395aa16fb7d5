/// Convenience result type used across bannerkit.
pub type BannerResult<T> = Result<T, BannerError>;

/// Top-level error taxonomy used by engine APIs.
///
/// Asset failures are deliberately absent: a broken image degrades to a skipped layer and is
/// reported through [`crate::AssetFailure`] instead.
#[derive(thiserror::Error, Debug)]
pub enum BannerError {
    /// Invalid user-provided descriptor, slot, or configuration data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors while compiling or rasterizing a banner plan.
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// A 17th slot was requested for one `(entity, category)` group.
    #[error(
        "slot capacity exceeded: '{entity_id}'/'{banner_category}' already holds {capacity} slots"
    )]
    SlotCapacityExceeded {
        /// Entity that owns the slot group.
        entity_id: String,
        /// Banner category of the slot group.
        banner_category: String,
        /// Maximum slots per group.
        capacity: usize,
    },

    /// The addressed slot does not exist.
    #[error("slot {slot_number} not found for '{entity_id}'/'{banner_category}'")]
    SlotNotFound {
        /// Entity that owns the slot group.
        entity_id: String,
        /// Banner category of the slot group.
        banner_category: String,
        /// Requested slot number.
        slot_number: u8,
    },

    /// Errors raised by the external slot persistence collaborator.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Terminal failure for a single export attempt.
    #[error("export error: {0}")]
    Export(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BannerError {
    /// Build a [`BannerError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`BannerError::Evaluation`] value.
    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    /// Build a [`BannerError::Persistence`] value.
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Build a [`BannerError::Export`] value.
    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    /// Build a [`BannerError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Returns `true` for [`BannerError::SlotCapacityExceeded`].
    pub fn is_capacity_exceeded(&self) -> bool {
        matches!(self, Self::SlotCapacityExceeded { .. })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
