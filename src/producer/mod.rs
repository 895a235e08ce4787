pub(crate) mod chain;
pub(crate) mod frame_producer;
pub(crate) mod handle;
