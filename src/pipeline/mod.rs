pub(crate) mod channel;
pub(crate) mod config;
pub(crate) mod layer;
pub(crate) mod playlist;
