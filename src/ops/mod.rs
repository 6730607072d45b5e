pub mod analytics;
pub mod archive_ops;
pub mod attach_ops;
pub mod calendar;
pub mod migrate;
pub mod nav;
pub mod progress;
pub mod tag_ops;
pub mod timer;
pub mod tree_ops;
