pub(crate) mod category;
pub(crate) mod layout;
pub(crate) mod plan;
