mod record;
pub use record::{ClientInfo, SummaryRecord};
