//! Wire types for the batch boundary.
//!
//! The inbound body pairs a list of image references with parallel parameter
//! arrays:
//!
//! ```json
//! {
//!   "uploadId": "3f1c...",
//!   "imageName": ["uploads/a.jpg", "uploads/b.png"],
//!   "imageParameters": {
//!     "resX": [800, 640],
//!     "rotationState": [0, 90],
//!     "brightness": [[50], [80]],
//!     "filter": ["none", "sepia"],
//!     "outputFormat": ["png", "jpg"]
//!   }
//! }
//! ```
//!
//! Every parameter array is optional and may be shorter than `imageName`.
//! Entries are kept as raw JSON values here; interpreting them is the job of
//! [`resolve`](crate::resolve).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One positional parameter as sent by the client.
///
/// A JSON array supplies one entry per image. A bare scalar applies to every
/// image in the batch. `null` or an absent key means "use the default".
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ParamList {
    #[default]
    Empty,
    PerImage(Vec<Value>),
    Broadcast(Value),
}

impl ParamList {
    /// Raw entry for image `index`, if the client sent one.
    pub fn get(&self, index: usize) -> Option<&Value> {
        match self {
            ParamList::Empty => None,
            ParamList::PerImage(values) => values.get(index),
            ParamList::Broadcast(value) => Some(value),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ParamList::Empty => true,
            ParamList::PerImage(values) => values.is_empty(),
            ParamList::Broadcast(_) => false,
        }
    }
}

impl From<Value> for ParamList {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ParamList::Empty,
            Value::Array(values) => ParamList::PerImage(values),
            scalar => ParamList::Broadcast(scalar),
        }
    }
}

impl<'de> Deserialize<'de> for ParamList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(ParamList::from)
    }
}

/// The positional parameter arrays of a batch.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageParameterArrays {
    pub overwritten_filename: ParamList,
    pub res_x: ParamList,
    pub res_y: ParamList,
    pub rotation_state: ParamList,
    pub brightness: ParamList,
    pub contrast: ParamList,
    pub saturation: ParamList,
    pub opacity: ParamList,
    pub output_format: ParamList,
    pub filter: ParamList,
}

/// Inbound batch body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    #[serde(default)]
    pub upload_id: Option<String>,
    #[serde(default)]
    pub image_name: Vec<String>,
    #[serde(default)]
    pub image_parameters: ImageParameterArrays,
}

impl BatchRequest {
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }
}

/// Success body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
    pub message: String,
    pub filenames: Vec<String>,
    pub urls: Vec<String>,
}

/// Failure body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
