//! Session configuration.

use serde::{Deserialize, Serialize};

use chainsync_core::error::TransportError;
use chainsync_core::point::Point;
use chainsync_core::request::{WireShape, DEFAULT_SERVICE_NAME};

/// Configuration for one chain-sync session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// WebSocket endpoint, e.g. "ws://localhost:1337"
    pub endpoint: String,
    /// Next-block requests kept outstanding
    #[serde(default = "default_pipeline")]
    pub pipeline: usize,
    /// Frames buffered between the reader and the consumer
    #[serde(default = "default_frame_capacity")]
    pub frame_capacity: usize,
    /// Protocol generation to speak
    #[serde(default)]
    pub shape: WireShape,
    /// Service name announced in legacy envelopes
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Intersection candidates (empty = origin)
    #[serde(default)]
    pub points: Vec<Point>,
}

fn default_pipeline() -> usize { 50 }
fn default_frame_capacity() -> usize { 8 }
fn default_service_name() -> String { DEFAULT_SERVICE_NAME.to_string() }

impl SessionConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            pipeline: default_pipeline(),
            frame_capacity: default_frame_capacity(),
            shape: WireShape::default(),
            service_name: default_service_name(),
            points: vec![],
        }
    }

    pub fn with_pipeline(mut self, pipeline: usize) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_frame_capacity(mut self, frame_capacity: usize) -> Self {
        self.frame_capacity = frame_capacity;
        self
    }

    pub fn with_shape(mut self, shape: WireShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = service_name.into();
        self
    }

    pub fn with_points(mut self, points: Vec<Point>) -> Self {
        self.points = points;
        self
    }

    /// Reject settings a session cannot run with.
    pub fn validate(&self) -> Result<(), TransportError> {
        if self.endpoint.is_empty() {
            return Err(TransportError::Config("endpoint must not be empty".into()));
        }
        if self.pipeline == 0 {
            return Err(TransportError::Config("pipeline must be at least 1".into()));
        }
        if self.frame_capacity == 0 {
            return Err(TransportError::Config("frame_capacity must be at least 1".into()));
        }
        Ok(())
    }
}
