pub(crate) mod buffer_pool;
pub(crate) mod context;
pub(crate) mod cpu;
