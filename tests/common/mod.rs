pub(crate) mod logging;

pub(crate) mod recorder;

pub(crate) mod validators;
