pub(crate) mod color;
pub(crate) mod prefetch;
pub(crate) mod still;
pub(crate) mod transition;
