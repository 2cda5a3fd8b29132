mod classifier;
mod lister;

pub use classifier::{contains_form, FormClassifier};
pub use lister::RoutingRecord;
