//! Image pipeline components.
//!
//! - **validate**: cheap checks before reading a file
//! - **decode**: JPEG/PNG decoding with dimension limits
//! - **orientation**: EXIF orientation read, apply and invert
//! - **metadata**: EXIF block carried into JPEG outputs
//! - **overlay**: debug drawing of detected faces
//! - **compositor**: crop, orientation on output, encoding
//! - **discovery**: finding photos in a directory
//! - **processor**: the single-image pipeline

pub mod compositor;
pub mod decode;
pub mod discovery;
pub mod metadata;
pub mod orientation;
pub mod overlay;
pub mod processor;
pub mod validate;

pub use compositor::{CompositeInput, Compositor, CompositorOptions};
pub use decode::{DecodedImage, ImageDecoder};
pub use discovery::{DiscoveredFile, FileDiscovery};
pub use orientation::{normalize, Orientation};
pub use overlay::OverlayStyle;
pub use processor::{CropOptions, CropOutcome, CropProcessor, DetectorFailurePolicy};
pub use validate::Validator;
