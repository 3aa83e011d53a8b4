pub mod check;
pub mod reconciler;
pub mod state;
pub mod uploader;

pub use check::CheckService;
pub use reconciler::{reconcile, FailurePolicy, FilmLookup, ReconcileFailure, ReconcileOutcome, RowOutcome};
pub use state::{AppState, Event, Operation, Phase, TransitionError};
pub use uploader::validate_upload;
