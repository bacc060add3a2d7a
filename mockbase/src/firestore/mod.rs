//! Document collection mock and its change-detection engine.

mod collection;
mod snapshot;

pub use collection::MockCollection;
pub use snapshot::{
    ChangeType, DocumentChange, DocumentSnapshot, QuerySnapshot, RecordSet, normalize,
};
