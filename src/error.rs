use crate::feed::{FetchError, LookupError};
use crate::filter::FilterError;
use crate::render::RenderError;
use thiserror::Error;

/// Any failure of the fetch → filter → render pipeline.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    /// A filter or the normalizer needed an entry field that was not there.
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Render(#[from] RenderError),
}
