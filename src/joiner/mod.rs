pub mod record_joiner;

pub use record_joiner::RecordJoiner;
