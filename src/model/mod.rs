pub use blog::*;
pub use counter::*;
pub use feedback::*;
pub use project::*;
pub use timestamp::*;

mod blog;
mod counter;
mod feedback;
mod project;
mod timestamp;

use crate::database::Record;

/// Serializes a record id as its bare key, which is what pages and JSON clients address entities by.
pub(crate) fn serialize_key<T, S: serde::Serializer>(
    record: &Record<T>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&record.key())
}
