pub(crate) mod gesture;
pub(crate) mod persistence;
pub(crate) mod store;
