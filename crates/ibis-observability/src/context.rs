// Request-scoped association properties for trace correlation

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TracingError {
    #[error("association property '{key}' must be a string, number or boolean")]
    NonScalarProperty { key: String },
}

/// Association properties for one request
///
/// Each request owns its own context; nothing is shared across requests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TracingContext {
    properties: BTreeMap<String, Value>,
}

impl TracingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge properties into the context
    ///
    /// Every value is validated first; on error nothing is published.
    pub fn set_association_properties(&mut self, properties: Map<String, Value>) -> Result<(), TracingError> {
        if let Some((key, _)) = properties
            .iter()
            .find(|(_, value)| matches!(value, Value::Object(_) | Value::Array(_) | Value::Null))
        {
            return Err(TracingError::NonScalarProperty { key: key.clone() });
        }

        self.properties.extend(properties);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn properties(&self) -> BTreeMap<String, Value> {
        self.properties.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}
