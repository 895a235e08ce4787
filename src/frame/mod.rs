pub(crate) mod buffer;
pub(crate) mod composite;
pub(crate) mod mix;
