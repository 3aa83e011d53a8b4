pub mod invoice;
pub mod reference;
pub mod result;
pub mod upload;

pub use invoice::{
    format_percentage, parse_play_week, round_percentage, InvoiceRecord, ResolvedPercentage,
    PLAY_WEEK_FORMAT,
};
pub use reference::ReferenceRecord;
pub use result::{Classification, ClassificationCounts};
pub use upload::{UploadFile, UploadKind};
