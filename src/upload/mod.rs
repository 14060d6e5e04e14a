//! Multipart upload engine
//!
//! A source is split into fixed-size parts ([`planner`]), every part gets an
//! upload target from the coordinator, parts are sent under a concurrency
//! ceiling ([`scheduler`]) while byte progress is aggregated ([`progress`]),
//! and the upload is finalized with the confirmed entity tags ([`session`]).

pub mod error;
pub mod limits;
pub mod part;
pub mod planner;
pub mod progress;
pub mod scheduler;
pub mod session;
pub mod source;
pub mod spec;

pub use self::error::UploadError;
pub use self::part::{Part, PartRange, PartTarget, Session, UploadedPart};
pub use self::progress::{ByteEvent, ProgressSnapshot, ProgressTracker};
pub use self::session::{Event, Report, State, UploadHandle, UploadSession};
pub use self::source::{ByteSource, ChunkStream, FileSource};
pub use self::spec::UploadSpec;
