use thiserror::Error;

/// Reasons a location fix could not be turned into a [`Coordinate`](crate::Coordinate).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("location fix unavailable: {0}")]
    Unavailable(String),
}

/// Failures of a fetch that are not a [`FetchOutcome`](crate::FetchOutcome).
///
/// Everything the weather endpoint can answer is classified into an outcome;
/// only conditions that make the attempt meaningless end up here.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("weather endpoint returned a body that does not match the expected schema: {source} (body: {body})")]
    MalformedPayload {
        #[source]
        source: serde_json::Error,
        body: String,
    },

    #[error("failed to build HTTP client")]
    Client(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum ScreenError {
    #[error("a weather retrieval is already in flight for this screen")]
    AlreadyRunning,

    #[error(transparent)]
    Fetch(#[from] FetchError),
}
