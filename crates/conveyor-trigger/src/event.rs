use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Notification that an object was created in a watched bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectCreated {
  pub bucket: BucketRef,
  pub object: ObjectRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketRef {
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRef {
  pub key: String,
}

impl ObjectCreated {
  pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
    Self {
      bucket: BucketRef {
        name: bucket.into(),
      },
      object: ObjectRef { key: key.into() },
    }
  }

  /// Build the initial execution context for this event.
  ///
  /// The event lands under `$.detail`, which is where the pipeline's first
  /// state expects the object identity.
  pub fn seed_context(&self) -> Value {
    json!({ "detail": self })
  }
}
