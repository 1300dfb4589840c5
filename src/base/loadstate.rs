/// The current state of a request moving through a `TransportAdapter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    /// The request has not started.
    #[default]
    Idle,

    /// Caller and additional headers have been merged.
    HeadersAssembled,

    /// The body policy has been applied and body bytes produced.
    BodyResolved,

    /// The call has been handed to the backend.
    Dispatched,

    /// The backend response has been mapped to a `TransportResponse`.
    ResponseNormalized,

    /// The response was returned to the caller.
    Done,

    /// The request failed in one of the states above.
    Failed,
}

impl LoadState {
    /// Whether no further transitions can happen.
    pub fn is_terminal(self) -> bool {
        matches!(self, LoadState::Done | LoadState::Failed)
    }
}
