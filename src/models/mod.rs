pub mod change_record;
pub mod order;

// Re-export models for easy access
pub use change_record::{
    AttributeValue, ChangeRecord, EventName, StreamChange, StreamEvent, StreamRecord,
};
pub use order::{epoch_to_utc, render_sql_timestamp, InsertRecord, UpdateRecord};
