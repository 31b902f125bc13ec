//! Uniform precedence evaluation: user value, then dataset, then fallback.

use std::collections::BTreeSet;

use array_store::DataType;
use serde_json::{Map, Value};

use crate::error::{ConfigError, Result};
use crate::types::ValueSource;

/// What is known while fields are being resolved.
///
/// Filled in as resolution proceeds, so later fields can be validated
/// against earlier ones (bands against the band count, statistics against
/// the composition size, and so on).
#[derive(Debug, Clone)]
pub struct ResolveContext {
    pub attributes: Map<String, Value>,
    pub dtype: DataType,
    pub time_dim: usize,
    pub band_count: usize,
    pub height: usize,
    pub width: usize,
    pub zoom_count: usize,
    pub composition: usize,
    pub timestamp_count: usize,
    pub statistics_keys: BTreeSet<String>,
}

/// A resolved value and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub value: T,
    pub source: ValueSource,
}

/// One property of the configuration: its name, the attribute that may carry
/// it in the dataset document, and its validator.
pub struct Field<T> {
    pub name: &'static str,
    pub attribute: Option<&'static str>,
    pub validate: fn(&Value, &ResolveContext) -> std::result::Result<T, String>,
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

impl<T> Field<T> {
    /// Evaluate the chain.
    ///
    /// Raw values (user input, then the attribute document) are validated and
    /// a failure is fatal. `extracted` is a dataset value already decoded from
    /// an array. `fallback` runs only when nothing else supplied a value.
    pub fn evaluate(
        &self,
        ctx: &ResolveContext,
        user: Option<&Value>,
        extracted: Option<T>,
        fallback: impl FnOnce(&ResolveContext) -> Option<T>,
    ) -> Result<Resolved<T>> {
        let attribute = self.attribute.and_then(|key| ctx.attributes.get(key));
        let raw = [
            (ValueSource::User, present(user)),
            (ValueSource::Dataset, present(attribute)),
        ];

        for (source, value) in raw {
            if let Some(value) = value {
                return (self.validate)(value, ctx)
                    .map(|value| Resolved { value, source })
                    .map_err(|constraint| ConfigError::invalid(self.name, constraint, source));
            }
        }

        if let Some(value) = extracted {
            return Ok(Resolved {
                value,
                source: ValueSource::Dataset,
            });
        }

        fallback(ctx)
            .map(|value| Resolved {
                value,
                source: ValueSource::Fallback,
            })
            .ok_or_else(|| ConfigError::Unresolved(self.name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context(attributes: Value) -> ResolveContext {
        ResolveContext {
            attributes: attributes.as_object().cloned().unwrap_or_default(),
            dtype: DataType::UInt8,
            time_dim: 1,
            band_count: 3,
            height: 4,
            width: 4,
            zoom_count: 1,
            composition: 1,
            timestamp_count: 1,
            statistics_keys: BTreeSet::new(),
        }
    }

    const SIZE: Field<u64> = Field {
        name: "size",
        attribute: Some("size"),
        validate: |v, _| v.as_u64().ok_or_else(|| "expected an integer".to_string()),
    };

    #[test]
    fn test_user_beats_dataset() {
        let ctx = context(json!({"size": 2}));
        let resolved = SIZE.evaluate(&ctx, Some(&json!(1)), Some(3), |_| Some(4)).unwrap();
        assert_eq!(resolved, Resolved { value: 1, source: ValueSource::User });
    }

    #[test]
    fn test_attribute_beats_extracted() {
        let ctx = context(json!({"size": 2}));
        let resolved = SIZE.evaluate(&ctx, None, Some(3), |_| Some(4)).unwrap();
        assert_eq!(resolved, Resolved { value: 2, source: ValueSource::Dataset });
    }

    #[test]
    fn test_null_counts_as_absent() {
        let ctx = context(json!({"size": null}));
        let resolved = SIZE.evaluate(&ctx, Some(&Value::Null), None, |_| Some(4)).unwrap();
        assert_eq!(resolved, Resolved { value: 4, source: ValueSource::Fallback });
    }

    #[test]
    fn test_invalid_value_names_source() {
        let ctx = context(json!({"size": "big"}));
        let err = SIZE.evaluate(&ctx, None, None, |_| Some(4)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { ref field, origin: ValueSource::Dataset, .. } if field == "size"
        ));
    }

    #[test]
    fn test_unresolved() {
        let ctx = context(json!({}));
        assert!(matches!(
            SIZE.evaluate(&ctx, None, None, |_| None),
            Err(ConfigError::Unresolved(_))
        ));
    }
}
