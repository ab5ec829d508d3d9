//! apishift-interchange: API snapshots and annotation stores.
//!
//! Provides the immutable [`ApiModel`] arena (one library version as a flat
//! map of elements with parent/child indices), the typed annotation payloads,
//! the [`AnnotationStore`], and the JSON reader/writer pair used at the
//! system boundary. Everything past this crate works on typed values only.

pub mod deserialize;
pub mod error;
pub mod model;
pub mod serialize;
pub mod store;
pub mod types;

pub use deserialize::{annotation_store_from_json, api_model_from_json};
pub use error::InputFormatError;
pub use model::ApiModel;
pub use serialize::{annotation_store_to_json, annotation_to_json, api_model_to_json};
pub use store::AnnotationStore;
pub use types::*;
