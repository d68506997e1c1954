pub mod carnival;
pub mod deadline;
pub mod documents;
pub mod error;
pub mod http;
pub mod identity;
pub mod tender;

pub use deadline::{Clock, ManualClock, SubmissionWindow, SystemClock};
pub use error::{BiddingError, RepositoryError, ValidationError};
pub use identity::{Caller, Role};
