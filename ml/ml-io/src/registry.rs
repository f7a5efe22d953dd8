//! Engine kinds and the static table of model factories.

use std::fmt;
use std::str::FromStr;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{IoError, Result};
use crate::io::ModelIo;

/// Inference engines a model can be declared against.
///
/// # Example
///
/// ```
/// use ml_io::EngineKind;
///
/// let engine: EngineKind = "tflite".parse().unwrap();
/// assert_eq!(engine, EngineKind::TfLite);
/// assert!(engine.runs_inference());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineKind {
    /// `TensorFlow` Lite.
    #[serde(rename = "tflite")]
    TfLite,

    /// `PyTorch` mobile.
    #[serde(rename = "pytorch")]
    PyTorch,

    /// No engine. The model only declares layers, e.g. to collect labels.
    #[serde(rename = "placeholder")]
    Placeholder,
}

impl EngineKind {
    /// All engine kinds.
    pub const ALL: [Self; 3] = [Self::TfLite, Self::PyTorch, Self::Placeholder];

    /// Returns `true` if models of this kind produce outputs.
    #[must_use]
    pub const fn runs_inference(&self) -> bool {
        !matches!(self, Self::Placeholder)
    }

    /// Returns the engine tag as a string.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::TfLite => "tflite",
            Self::PyTorch => "pytorch",
            Self::Placeholder => "placeholder",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EngineKind {
    type Err = IoError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| IoError::unknown_engine(s))
    }
}

/// Builds a model from its layer interface.
pub type ModelFactory<M> = fn(&ModelIo) -> Result<M>;

/// Factories for the engines an application links against.
///
/// # Example
///
/// ```
/// use ml_io::{EngineKind, ModelIo, ModelRegistry};
///
/// struct Echo(usize);
///
/// let mut registry: ModelRegistry<Echo> = ModelRegistry::new();
/// registry.register(EngineKind::Placeholder, |io: &ModelIo| Ok(Echo(io.inputs().len())));
///
/// let io = ModelIo::new(Vec::new(), Vec::new(), None).unwrap();
/// let model = registry.instantiate(EngineKind::Placeholder, &io).unwrap();
/// assert_eq!(model.0, 0);
/// assert!(registry.instantiate(EngineKind::TfLite, &io).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct ModelRegistry<M> {
    factories: HashMap<EngineKind, ModelFactory<M>>,
}

impl<M> ModelRegistry<M> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registers the factory for `engine`, returning any it replaces.
    pub fn register(
        &mut self,
        engine: EngineKind,
        factory: ModelFactory<M>,
    ) -> Option<ModelFactory<M>> {
        debug!(%engine, "model factory registered");
        self.factories.insert(engine, factory)
    }

    /// Returns `true` if a factory is registered for `engine`.
    #[must_use]
    pub fn contains(&self, engine: EngineKind) -> bool {
        self.factories.contains_key(&engine)
    }

    /// Returns the registered engines.
    pub fn engines(&self) -> impl Iterator<Item = EngineKind> + '_ {
        self.factories.keys().copied()
    }

    /// Builds a model for `engine`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::UnknownEngine`] if no factory is registered, or the
    /// factory's own error.
    pub fn instantiate(&self, engine: EngineKind, io: &ModelIo) -> Result<M> {
        let factory = self
            .factories
            .get(&engine)
            .ok_or_else(|| IoError::unknown_engine(engine.name()))?;
        debug!(%engine, "instantiating model");
        factory(io)
    }

    /// Builds a model for the engine named by `tag`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::UnknownEngine`] if the tag names no engine or no
    /// factory is registered for it.
    pub fn instantiate_tagged(&self, tag: &str, io: &ModelIo) -> Result<M> {
        self.instantiate(tag.parse()?, io)
    }
}

impl<M> Default for ModelRegistry<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::layer::{LayerInterface, LayerRole};
    use crate::vector::VectorLayerDescription;

    #[derive(Debug, PartialEq)]
    enum Model {
        Lite(usize),
        Torch(usize),
    }

    fn io() -> ModelIo {
        let d = VectorLayerDescription::new(vec![2], false, None, false, None, None).unwrap();
        let input = LayerInterface::new("x", LayerRole::Input, d).unwrap();
        ModelIo::new(vec![input], Vec::new(), None).unwrap()
    }

    fn registry() -> ModelRegistry<Model> {
        let mut r: ModelRegistry<Model> = ModelRegistry::new();
        r.register(EngineKind::TfLite, |io| Ok(Model::Lite(io.inputs().len())));
        r.register(EngineKind::PyTorch, |io| Ok(Model::Torch(io.outputs().len())));
        r
    }

    #[test]
    fn engine_names() {
        assert_eq!(EngineKind::TfLite.name(), "tflite");
        assert_eq!(EngineKind::PyTorch.to_string(), "pytorch");
        assert!(!EngineKind::Placeholder.runs_inference());
    }

    #[test]
    fn engine_parse() {
        for kind in EngineKind::ALL {
            assert_eq!(kind.name().parse::<EngineKind>().unwrap(), kind);
        }
        assert_eq!(
            "coreml".parse::<EngineKind>().unwrap_err(),
            IoError::unknown_engine("coreml")
        );
    }

    #[test]
    fn engine_serialization() {
        let json = serde_json::to_string(&EngineKind::TfLite).unwrap();
        assert_eq!(json, r#""tflite""#);
        let parsed: EngineKind = serde_json::from_str(r#""placeholder""#).unwrap();
        assert_eq!(parsed, EngineKind::Placeholder);
    }

    #[test]
    fn dispatches_by_engine() {
        let r = registry();
        let io = io();
        assert_eq!(r.instantiate(EngineKind::TfLite, &io).unwrap(), Model::Lite(1));
        assert_eq!(r.instantiate_tagged("pytorch", &io).unwrap(), Model::Torch(0));
        assert!(r.contains(EngineKind::TfLite));
        assert_eq!(r.engines().count(), 2);
    }

    #[test]
    fn unregistered_engine_rejected() {
        let r = registry();
        let io = io();
        assert_eq!(
            r.instantiate(EngineKind::Placeholder, &io).unwrap_err(),
            IoError::unknown_engine("placeholder")
        );
        assert!(matches!(
            r.instantiate_tagged("onnx", &io),
            Err(IoError::UnknownEngine(_))
        ));
    }

    #[test]
    fn factory_errors_propagate() {
        let mut r: ModelRegistry<Model> = ModelRegistry::default();
        r.register(EngineKind::TfLite, |_| Err(IoError::invalid_config("no weights")));
        assert!(matches!(
            r.instantiate(EngineKind::TfLite, &io()),
            Err(IoError::InvalidConfig(_))
        ));
    }

    #[test]
    fn register_replaces() {
        let mut r = registry();
        assert!(r.register(EngineKind::TfLite, |_| Ok(Model::Lite(9))).is_some());
        assert_eq!(r.instantiate(EngineKind::TfLite, &io()).unwrap(), Model::Lite(9));
    }
}
