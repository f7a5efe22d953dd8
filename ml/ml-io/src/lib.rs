//! Model I/O for on-device inference.
//!
//! This crate describes the layers a model reads and writes and converts
//! application values to and from the flat buffers an inference engine
//! consumes:
//!
//! # Layer Descriptions
//!
//! - [`VectorLayerDescription`] - Shape, labels and quantization of a vector layer
//! - [`ImageLayerDescription`] - Dimensions, channel order and normalization of an image layer
//! - [`LayerInterface`] - A named layer with its [`LayerRole`]
//! - [`ModelIo`] - A model's inputs, outputs and placeholders
//!
//! # Conversion
//!
//! - [`Quantizer`] / [`Dequantizer`] - Maps between `f32` and `u8`
//! - [`DataConverter`] - Allocates, writes and reads [`BackingBuffer`]s
//! - [`Value`] - Values exchanged with the application
//!
//! # Post-processing
//!
//! - [`smooth_classification`] - Exponential smoothing of label probabilities
//! - [`ClassificationStream`] - Smoothing state across frames
//!
//! # Configuration
//!
//! - [`ModelIoSpec`] - Declarative layer configuration, parsed from JSON
//! - [`ModelRegistry`] - Factories keyed by [`EngineKind`]
//!
//! Engines themselves are out of scope; this crate only produces and reads
//! their buffers.
//!
//! # Example
//!
//! ```
//! use ml_io::{ModelIoSpec, Value};
//!
//! let io = ModelIoSpec::from_json(r#"{
//!     "inputs": [{ "name": "x", "type": "array", "shape": [2, 2] }],
//!     "outputs": [{ "name": "p", "type": "array", "shape": [2], "labels": ["no", "yes"] }]
//! }"#)
//! .unwrap()
//! .build()
//! .unwrap();
//!
//! let input = io.inputs().get_by_name("x").unwrap().description();
//! let buffer = input.to_buffer(&Value::Vector(vec![1.0, 2.0, 3.0, 4.0])).unwrap();
//! assert_eq!(buffer.len(), 4);
//!
//! let output = io.outputs().get(0).unwrap().description();
//! let mut out = output.create_backing_buffer();
//! out.as_bytes_mut()[4..].copy_from_slice(&0.75f32.to_ne_bytes());
//! let labeled = output.from_buffer(&out).unwrap();
//! assert_eq!(labeled.as_labeled().unwrap()["yes"], 0.75);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod classification;
mod collection;
mod config;
mod converter;
mod error;
mod image;
mod io;
mod layer;
mod pixels;
mod quantize;
mod registry;
mod shape;
mod value;
mod vector;

// Re-export layer descriptions
pub use image::{
    CHANNELS, ImageLayerDescription, NormalizationSpec, PixelFormat, PixelNormalization,
};
pub use io::ModelIo;
pub use layer::{LayerDescription, LayerInterface, LayerRole};
pub use vector::{ElementType, VectorLayerDescription};

// Re-export conversion
pub use converter::{DataConverter, PixelConverter, VectorConverter};
pub use pixels::PixelBuffer;
pub use quantize::{Dequantizer, QuantizationSpec, Quantizer, StandardScheme};
pub use value::{BackingBuffer, Value};

// Re-export collections
pub use collection::{Named, NamedCollection};

// Re-export post-processing
pub use classification::{
    ClassificationMap, ClassificationStream, SmoothingConfig, smooth_classification, top_n,
};

// Re-export configuration
pub use config::{LayerKindSpec, LayerSpec, ModelIoSpec};
pub use registry::{EngineKind, ModelFactory, ModelRegistry};

// Re-export error types
pub use error::{IoError, Result};
