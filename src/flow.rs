//! View state for the analysis screen.
//!
//! The screen moves between six states. The camera is just a frame source
//! here; whatever drives it calls `capture_frame` with an encoded image.
//!
//! ```text
//! Idle --start_camera--> CameraActive --capture_frame--> ImageReady
//! Idle/ImageReady/ResultReady/Error --load_image--> ImageReady
//! ImageReady/ResultReady/Error --begin_analysis--> PendingRequest
//! PendingRequest --complete(Ok)--> ResultReady
//! PendingRequest --complete(Err)--> Error
//! ```

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::analyzer::{AnalysisRequest, AnalysisResult, OutputShape};
use crate::client::InlineData;
use crate::error::AnalysisError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    Idle,
    CameraActive,
    ImageReady,
    PendingRequest,
    ResultReady,
    Error,
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlowState::Idle => "idle",
            FlowState::CameraActive => "camera-active",
            FlowState::ImageReady => "image-ready",
            FlowState::PendingRequest => "pending-request",
            FlowState::ResultReady => "result-ready",
            FlowState::Error => "error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("An analysis is already in progress")]
    RequestInFlight,

    #[error("Please upload or capture an image first.")]
    MissingImage,

    #[error("Cannot {action} while {state}")]
    InvalidTransition { state: FlowState, action: &'static str },
}

/// Analysis screen state. At most one request is pending at a time.
#[derive(Debug, Clone)]
pub struct AnalysisFlow {
    state: FlowState,
    output: OutputShape,
    image: Option<InlineData>,
    result: Option<AnalysisResult>,
    error: Option<String>,
}

impl AnalysisFlow {
    pub fn new(output: OutputShape) -> Self {
        Self {
            state: FlowState::Idle,
            output,
            image: None,
            result: None,
            error: None,
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn output(&self) -> OutputShape {
        self.output
    }

    pub fn image(&self) -> Option<&InlineData> {
        self.image.as_ref()
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    /// Most recent error message, if the last action failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        self.state == FlowState::PendingRequest
    }

    fn transition(&mut self, next: FlowState) {
        if self.state != next {
            info!("Analysis flow: {} -> {}", self.state, next);
        }
        self.state = next;
    }

    fn reject_if_pending(&self, action: &'static str) -> Result<(), FlowError> {
        if self.is_pending() {
            warn!("Rejected '{}' while a request is pending", action);
            return Err(FlowError::RequestInFlight);
        }
        Ok(())
    }

    fn resting_state(&self) -> FlowState {
        if self.image.is_some() {
            FlowState::ImageReady
        } else {
            FlowState::Idle
        }
    }

    pub fn start_camera(&mut self) -> Result<(), FlowError> {
        self.reject_if_pending("start the camera")?;
        if self.state == FlowState::CameraActive {
            return Err(FlowError::InvalidTransition {
                state: self.state,
                action: "start the camera",
            });
        }
        self.transition(FlowState::CameraActive);
        Ok(())
    }

    /// Turn the camera off without capturing.
    pub fn stop_camera(&mut self) -> Result<(), FlowError> {
        if self.state != FlowState::CameraActive {
            return Err(FlowError::InvalidTransition {
                state: self.state,
                action: "stop the camera",
            });
        }
        let next = self.resting_state();
        self.transition(next);
        Ok(())
    }

    /// Take the current camera frame as the image. Stops the camera.
    pub fn capture_frame(&mut self, frame: InlineData) -> Result<(), FlowError> {
        if self.state != FlowState::CameraActive {
            return Err(FlowError::InvalidTransition {
                state: self.state,
                action: "capture a frame",
            });
        }
        self.set_image(frame);
        Ok(())
    }

    /// Use an uploaded image. Allowed from any state except pending.
    pub fn load_image(&mut self, image: InlineData) -> Result<(), FlowError> {
        self.reject_if_pending("load an image")?;
        self.set_image(image);
        Ok(())
    }

    fn set_image(&mut self, image: InlineData) {
        self.image = Some(image);
        self.result = None;
        self.error = None;
        self.transition(FlowState::ImageReady);
    }

    /// Start an analysis and hand back the request to submit.
    ///
    /// Clears the previous result and error. Without an image the flow
    /// moves to `Error` and nothing is submitted.
    pub fn begin_analysis(&mut self) -> Result<AnalysisRequest, FlowError> {
        self.reject_if_pending("start an analysis")?;
        if self.state == FlowState::CameraActive {
            return Err(FlowError::InvalidTransition {
                state: self.state,
                action: "start an analysis",
            });
        }

        let Some(image) = self.image.clone() else {
            self.fail(FlowError::MissingImage.to_string());
            return Err(FlowError::MissingImage);
        };

        self.result = None;
        self.error = None;
        self.transition(FlowState::PendingRequest);
        Ok(AnalysisRequest::for_image(image, self.output))
    }

    /// Record the outcome of the pending request.
    pub fn complete(
        &mut self,
        outcome: Result<AnalysisResult, AnalysisError>,
    ) -> Result<(), FlowError> {
        if !self.is_pending() {
            return Err(FlowError::InvalidTransition {
                state: self.state,
                action: "complete an analysis",
            });
        }
        match outcome {
            Ok(result) => {
                self.result = Some(result);
                self.transition(FlowState::ResultReady);
            }
            Err(e) => self.fail(format!("Analysis failed: {}", e)),
        }
        Ok(())
    }

    fn fail(&mut self, message: String) {
        self.error = Some(message);
        self.transition(FlowState::Error);
    }

    /// Drop image, result and error.
    pub fn reset(&mut self) -> Result<(), FlowError> {
        self.reject_if_pending("reset")?;
        self.image = None;
        self.result = None;
        self.error = None;
        self.transition(FlowState::Idle);
        Ok(())
    }
}
