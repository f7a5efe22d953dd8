//! Declarative model I/O configuration.
//!
//! A [`ModelIoSpec`] is the parsed form of a model's layer declarations. It
//! carries scheme names and parameters only; [`ModelIoSpec::build`] resolves
//! them into quantizers and normalizations and validates every layer.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{IoError, Result};
use crate::image::{ImageLayerDescription, NormalizationSpec, PixelFormat};
use crate::io::ModelIo;
use crate::layer::{LayerDescription, LayerInterface, LayerRole};
use crate::quantize::QuantizationSpec;
use crate::vector::VectorLayerDescription;

/// Layer declarations for one model.
///
/// # Example
///
/// ```
/// use ml_io::ModelIoSpec;
///
/// let spec = ModelIoSpec::from_json(r#"{
///     "quantized": false,
///     "inputs": [{ "name": "x", "type": "array", "shape": [4] }],
///     "outputs": [{ "name": "y", "type": "array", "shape": [2], "labels": ["cat", "dog"] }]
/// }"#)
/// .unwrap();
///
/// let io = spec.build().unwrap();
/// assert_eq!(io.inputs().get_by_name("x").unwrap().description().length(), 4);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelIoSpec {
    /// Whether every layer of the model carries quantized values.
    #[serde(default)]
    pub quantized: bool,

    /// Input layer declarations, in model order.
    pub inputs: Vec<LayerSpec>,

    /// Output layer declarations, in model order.
    pub outputs: Vec<LayerSpec>,

    /// Placeholder layer declarations, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholders: Option<Vec<LayerSpec>>,
}

impl ModelIoSpec {
    /// Creates an empty spec.
    #[must_use]
    pub const fn new(quantized: bool) -> Self {
        Self {
            quantized,
            inputs: Vec::new(),
            outputs: Vec::new(),
            placeholders: None,
        }
    }

    /// Parses a spec from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Deserialization`] if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Adds an input layer.
    #[must_use]
    pub fn with_input(mut self, layer: LayerSpec) -> Self {
        self.inputs.push(layer);
        self
    }

    /// Adds an output layer.
    #[must_use]
    pub fn with_output(mut self, layer: LayerSpec) -> Self {
        self.outputs.push(layer);
        self
    }

    /// Adds a placeholder layer.
    #[must_use]
    pub fn with_placeholder(mut self, layer: LayerSpec) -> Self {
        self.placeholders.get_or_insert_with(Vec::new).push(layer);
        self
    }

    /// Resolves every declaration and assembles the model's layers.
    ///
    /// # Errors
    ///
    /// Returns the first construction error of any layer, or an error from
    /// [`ModelIo::new`].
    pub fn build(&self) -> Result<ModelIo> {
        let build_all = |specs: &[LayerSpec], role: LayerRole| {
            specs
                .iter()
                .map(|s| s.build(role, self.quantized))
                .collect::<Result<Vec<_>>>()
        };

        let inputs = build_all(&self.inputs, LayerRole::Input)?;
        let outputs = build_all(&self.outputs, LayerRole::Output)?;
        let placeholders = self
            .placeholders
            .as_deref()
            .map(|p| build_all(p, LayerRole::Placeholder))
            .transpose()?;

        debug!(quantized = self.quantized, "model io spec resolved");
        ModelIo::new(inputs, outputs, placeholders)
    }
}

/// Declaration of one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    /// Layer name, unique within its role.
    pub name: String,

    /// Whether the first dimension is a batch dimension.
    #[serde(default)]
    pub batched: bool,

    /// Kind-specific fields.
    #[serde(flatten)]
    pub kind: LayerKindSpec,
}

/// Kind-specific layer fields, tagged by `"type"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayerKindSpec {
    /// A vector layer.
    Array {
        /// Declared shape.
        shape: Vec<i64>,
        /// Output labels, one per element.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        labels: Option<Vec<String>>,
        /// Quantization applied when writing.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        quantize: Option<QuantizationSpec>,
        /// Dequantization applied when reading.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dequantize: Option<QuantizationSpec>,
    },
    /// An image layer.
    Image {
        /// Declared shape.
        shape: Vec<i64>,
        /// Channel order.
        #[serde(default)]
        format: PixelFormat,
        /// Pixel normalization for written layers.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        normalize: Option<NormalizationSpec>,
        /// Pixel normalization for read layers.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        denormalize: Option<NormalizationSpec>,
    },
}

impl LayerSpec {
    /// Declares a vector layer with no labels or quantization.
    #[must_use]
    pub fn array(name: impl Into<String>, shape: Vec<i64>) -> Self {
        Self {
            name: name.into(),
            batched: false,
            kind: LayerKindSpec::Array {
                shape,
                labels: None,
                quantize: None,
                dequantize: None,
            },
        }
    }

    /// Declares an RGB image layer with no normalization.
    #[must_use]
    pub fn image(name: impl Into<String>, shape: Vec<i64>) -> Self {
        Self {
            name: name.into(),
            batched: false,
            kind: LayerKindSpec::Image {
                shape,
                format: PixelFormat::Rgb,
                normalize: None,
                denormalize: None,
            },
        }
    }

    /// Marks the layer as batched.
    #[must_use]
    pub fn with_batched(mut self, batched: bool) -> Self {
        self.batched = batched;
        self
    }

    /// Resolves this declaration into a layer of `role`.
    ///
    /// # Errors
    ///
    /// - [`IoError::InvalidConfig`] if an image layer declares the
    ///   normalization of the opposite direction, or parameters are invalid.
    /// - Any construction error of the resolved description.
    pub fn build(&self, role: LayerRole, quantized: bool) -> Result<LayerInterface> {
        let description: LayerDescription = match &self.kind {
            LayerKindSpec::Array {
                shape,
                labels,
                quantize,
                dequantize,
            } => VectorLayerDescription::new(
                shape.clone(),
                self.batched,
                labels.clone(),
                quantized,
                quantize.as_ref().map(QuantizationSpec::quantizer).transpose()?,
                dequantize
                    .as_ref()
                    .map(QuantizationSpec::dequantizer)
                    .transpose()?,
            )?
            .into(),
            LayerKindSpec::Image {
                shape,
                format,
                normalize,
                denormalize,
            } => {
                let (used, unused) = if role.is_written() {
                    (normalize, denormalize)
                } else {
                    (denormalize, normalize)
                };
                if unused.is_some() {
                    return Err(IoError::invalid_config(format!(
                        "{role} image layer '{}' declares a normalization for the opposite direction",
                        self.name
                    )));
                }
                let normalization = used.as_ref().map(NormalizationSpec::resolve).transpose()?;
                ImageLayerDescription::new(
                    shape.clone(),
                    self.batched,
                    *format,
                    quantized,
                    normalization,
                )?
                .into()
            }
        };
        LayerInterface::new(self.name.clone(), role, description)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::image::PixelNormalization;
    use crate::quantize::StandardScheme;

    const QUANTIZED: &str = r#"{
        "quantized": true,
        "inputs": [
            { "name": "vector", "type": "array", "shape": [-1, 4], "batched": true,
              "quantize": { "standard": "[0,1]" } },
            { "name": "image", "type": "image", "shape": [128, 128, 3], "format": "BGR" }
        ],
        "outputs": [
            { "name": "classes", "type": "array", "shape": [3],
              "labels": ["a", "b", "c"],
              "dequantize": { "scale": 0.00392156862745098, "bias": 0.0 } }
        ]
    }"#;

    #[test]
    fn parses_quantized_model() {
        let spec = ModelIoSpec::from_json(QUANTIZED).unwrap();
        assert!(spec.quantized);
        assert_eq!(spec.inputs.len(), 2);
        assert!(spec.inputs[0].batched);
        assert!(spec.placeholders.is_none());
        assert!(matches!(
            spec.inputs[1].kind,
            LayerKindSpec::Image { format: PixelFormat::Bgr, .. }
        ));
    }

    #[test]
    fn builds_quantized_model() {
        let io = ModelIoSpec::from_json(QUANTIZED).unwrap().build().unwrap();

        let vector = io.inputs().get_by_name("vector").unwrap().description();
        assert!(vector.is_quantized());
        assert!(vector.is_batched());
        assert_eq!(vector.length(), 4);

        let image = io.inputs().get(1).unwrap().description().as_image().unwrap();
        assert_eq!(image.format(), PixelFormat::Bgr);
        assert_eq!((image.width(), image.height()), (128, 128));

        let classes = io.outputs().get_by_name("classes").unwrap().description();
        let classes = classes.as_vector().unwrap();
        assert_eq!(classes.labels().unwrap().len(), 3);
        assert_eq!(classes.dequantizer().unwrap().dequantize(255), 1.0);
    }

    #[test]
    fn missing_quantizer_surfaces() {
        let spec = ModelIoSpec::new(true).with_input(LayerSpec::array("x", vec![2]));
        assert!(matches!(spec.build(), Err(IoError::MissingQuantizer(_))));
    }

    #[test]
    fn unexpected_quantizer_surfaces() {
        let mut layer = LayerSpec::array("x", vec![2]);
        if let LayerKindSpec::Array { quantize, .. } = &mut layer.kind {
            *quantize = Some(StandardScheme::ZeroToOne.into());
        }
        let spec = ModelIoSpec::new(false).with_input(layer);
        assert!(matches!(spec.build(), Err(IoError::UnexpectedQuantizer(_))));
    }

    #[test]
    fn image_normalization_by_role() {
        let json = r#"{
            "inputs": [{ "name": "in", "type": "image", "shape": [2, 2, 3],
                         "normalize": { "standard": "[-1,1]" } }],
            "outputs": [{ "name": "out", "type": "image", "shape": [2, 2, 3],
                          "denormalize": { "scale": 0.5, "bias": [0.0, 0.0, 0.0] } }]
        }"#;
        let io = ModelIoSpec::from_json(json).unwrap().build().unwrap();

        let input = io.inputs().get(0).unwrap().description().as_image().unwrap();
        assert_eq!(
            input.normalization(),
            Some(&PixelNormalization::NEGATIVE_ONE_TO_ONE)
        );
        let output = io.outputs().get(0).unwrap().description().as_image().unwrap();
        assert_eq!(output.normalization().unwrap().scale, [0.5; 3]);
    }

    #[test]
    fn opposite_direction_normalization_rejected() {
        let json = r#"{
            "inputs": [{ "name": "in", "type": "image", "shape": [2, 2, 3],
                         "denormalize": { "standard": "[0,1]" } }],
            "outputs": []
        }"#;
        let err = ModelIoSpec::from_json(json).unwrap().build();
        assert!(matches!(err, Err(IoError::InvalidConfig(_))));
    }

    #[test]
    fn placeholders_built_with_placeholder_role() {
        let spec = ModelIoSpec::new(false)
            .with_input(LayerSpec::image("photo", vec![4, 4, 3]))
            .with_placeholder(LayerSpec::array("label", vec![1]));
        let io = spec.build().unwrap();
        let placeholder = io.placeholders().unwrap().get(0).unwrap();
        assert_eq!(placeholder.role(), LayerRole::Placeholder);
        assert!(io.outputs().is_empty());
    }

    #[test]
    fn duplicate_labels_surface() {
        let json = r#"{
            "inputs": [],
            "outputs": [{ "name": "y", "type": "array", "shape": [2], "labels": ["a", "a"] }]
        }"#;
        let err = ModelIoSpec::from_json(json).unwrap().build();
        assert_eq!(err.unwrap_err(), IoError::duplicate_label("a"));
    }

    #[test]
    fn unknown_type_is_deserialization_error() {
        let json = r#"{ "inputs": [{ "name": "x", "type": "audio", "shape": [1] }], "outputs": [] }"#;
        assert!(matches!(
            ModelIoSpec::from_json(json),
            Err(IoError::Deserialization(_))
        ));
    }

    #[test]
    fn serde_roundtrip() {
        let spec = ModelIoSpec::new(false)
            .with_input(LayerSpec::array("x", vec![-1, 3]).with_batched(true))
            .with_output(LayerSpec::image("y", vec![8, 8, 3]));
        let json = serde_json::to_string(&spec).unwrap();
        let parsed = ModelIoSpec::from_json(&json).unwrap();
        assert_eq!(parsed, spec);
    }
}
