pub mod default_record;

pub use default_record::{DefaultPayload, DefaultRecord};
