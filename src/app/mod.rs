pub mod errors;
pub mod local;
mod transfer;

pub use errors::AppError;
pub use local::{AppLocal, BackfillOpts, BackfillReport, NoteView, Stats};
pub use transfer::ImportReport;
