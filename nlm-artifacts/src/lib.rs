//! Artifact lookup, media URL resolution and interactive-content export.
//!
//! The listing endpoint of the notebook service answers with positional,
//! loosely typed JSON arrays. [`record`] wraps one entry in a checked view,
//! [`locator`] finds artifacts and their download URL, [`app_data`] pulls the
//! JSON payload out of an interactive page and [`format`] renders it. The
//! [`client`] module ties these to the HTTP transport and an [`profile::AuthProfile`].
pub mod app_data;
pub mod client;
pub mod error;
pub mod format;
pub mod locator;
pub mod profile;
pub mod record;

pub use app_data::extract_app_data;
pub use client::{ArtifactDetails, ArtifactSource, NotebookClient};
pub use error::{ClientError, ExtractionError};
pub use format::{ContentKind, format_interactive_content};
pub use locator::{extract_media_url, find_artifact, summarize};
pub use profile::AuthProfile;
pub use record::{ArtifactKind, ArtifactRecord, ArtifactSummary};
