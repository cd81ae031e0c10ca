pub mod enums;
pub mod record;

pub use enums::RecordKind;
pub use record::Record;
