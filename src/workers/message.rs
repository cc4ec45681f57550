use std::sync::Arc;

/// A unit of data moved from a broker endpoint to the sink.
///
/// The supervisor never looks inside; only sources and destinations interpret it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Endpoint the message was consumed from.
    pub endpoint: Arc<str>,
    /// Optional partitioning key for the destination.
    pub key: Option<Vec<u8>>,
    /// Raw body.
    pub payload: Vec<u8>,
    /// Broker headers carried through as-is.
    pub headers: Vec<(String, String)>,
}

impl Message {
    pub fn new(endpoint: impl Into<Arc<str>>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            endpoint: endpoint.into(),
            key: None,
            payload: payload.into(),
            headers: Vec::new(),
        }
    }

    #[inline]
    pub fn with_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = Some(key.into());
        self
    }

    #[inline]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}
