pub(crate) mod exports;
pub(crate) mod notifier;
pub(crate) mod reporting;
pub(crate) mod scoring;
