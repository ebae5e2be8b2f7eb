mod record;

pub use record::SessionRecord;
