//! The complete set of layers a model reads and writes.

use tracing::debug;

use crate::collection::NamedCollection;
use crate::error::{IoError, Result};
use crate::layer::{LayerInterface, LayerRole};

/// A model's inputs, outputs and optional placeholders, each addressable
/// by index or name.
///
/// # Example
///
/// ```
/// use ml_io::{LayerInterface, LayerRole, ModelIo, VectorLayerDescription};
///
/// let vector = |n| VectorLayerDescription::new(vec![n], false, None, false, None, None).unwrap();
/// let io = ModelIo::new(
///     vec![LayerInterface::new("x", LayerRole::Input, vector(3)).unwrap()],
///     vec![LayerInterface::new("y", LayerRole::Output, vector(1)).unwrap()],
///     None,
/// )
/// .unwrap();
///
/// assert_eq!(io.inputs().len(), 1);
/// assert_eq!(io.outputs().index_for("y"), Some(0));
/// assert!(io.placeholders().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct ModelIo {
    inputs: NamedCollection<LayerInterface>,
    outputs: NamedCollection<LayerInterface>,
    placeholders: Option<NamedCollection<LayerInterface>>,
}

impl ModelIo {
    /// Groups layers by role.
    ///
    /// # Errors
    ///
    /// - [`IoError::InvalidConfig`] if a layer sits in the wrong group.
    /// - [`IoError::DuplicateName`] if two layers in a group share a name.
    pub fn new(
        inputs: Vec<LayerInterface>,
        outputs: Vec<LayerInterface>,
        placeholders: Option<Vec<LayerInterface>>,
    ) -> Result<Self> {
        check_roles(&inputs, LayerRole::Input)?;
        check_roles(&outputs, LayerRole::Output)?;
        if let Some(placeholders) = &placeholders {
            check_roles(placeholders, LayerRole::Placeholder)?;
        }

        let io = Self {
            inputs: NamedCollection::new(inputs)?,
            outputs: NamedCollection::new(outputs)?,
            placeholders: placeholders.map(NamedCollection::new).transpose()?,
        };
        debug!(
            inputs = io.inputs.len(),
            outputs = io.outputs.len(),
            placeholders = io.placeholders.as_ref().map_or(0, NamedCollection::len),
            "model io assembled"
        );
        Ok(io)
    }

    /// Returns the input layers.
    #[must_use]
    pub const fn inputs(&self) -> &NamedCollection<LayerInterface> {
        &self.inputs
    }

    /// Returns the output layers.
    #[must_use]
    pub const fn outputs(&self) -> &NamedCollection<LayerInterface> {
        &self.outputs
    }

    /// Returns the placeholder layers, if the model declares any.
    #[must_use]
    pub const fn placeholders(&self) -> Option<&NamedCollection<LayerInterface>> {
        self.placeholders.as_ref()
    }

    /// Returns the layers of `role`, if the model declares that group.
    #[must_use]
    pub const fn by_role(&self, role: LayerRole) -> Option<&NamedCollection<LayerInterface>> {
        match role {
            LayerRole::Input => Some(&self.inputs),
            LayerRole::Output => Some(&self.outputs),
            LayerRole::Placeholder => self.placeholders.as_ref(),
        }
    }
}

fn check_roles(layers: &[LayerInterface], role: LayerRole) -> Result<()> {
    match layers.iter().find(|l| l.role() != role) {
        Some(layer) => Err(IoError::invalid_config(format!(
            "{} layer '{}' listed among {role} layers",
            layer.role(),
            layer.name()
        ))),
        None => Ok(()),
    }
}
