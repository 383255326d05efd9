//! Result conversion for the command executor.
//!
//! Each remote result object becomes an ordered list of property name/value
//! pairs, whatever shape the backend used. The list is serialized as a JSON
//! array in which every element is an object (or `null`).

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

use crate::dispatch::fault::{ExecutorFailure, FailureReason, FaultClass};

/// Flat command parameters parsed from the request body.
pub type Parameters = Map<String, Value>;

/// Ordered property name/value pairs of one result object.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PropertyBag(Vec<(String, Value)>);

impl PropertyBag {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// `null` has no properties; a non-object becomes a single `Value` property.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Object(map) => Some(Self(map.into_iter().collect())),
            other => Some(Self(vec![("Value".to_string(), other)])),
        }
    }
}

impl Serialize for PropertyBag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Convert and serialize all result objects of one invocation.
pub fn serialize_results(objects: Vec<Value>) -> Result<String, ExecutorFailure> {
    let bags: Vec<Option<PropertyBag>> = objects.into_iter().map(PropertyBag::from_value).collect();
    serde_json::to_string(&bags).map_err(|e| {
        ExecutorFailure::new(
            FailureReason::Invocation(Some(FaultClass::NonTransient)),
            format!("result conversion failed: {}", e),
        )
    })
}

/// Parse the request body as a flat JSON object of parameters.
///
/// An empty body means no parameters.
pub fn parse_parameters(body: &[u8]) -> Result<Parameters, ExecutorFailure> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Parameters::new());
    }

    let invalid = |detail: String| ExecutorFailure::new(FailureReason::InvalidParameters, detail);

    let value: Value = serde_json::from_slice(body).map_err(|e| invalid(e.to_string()))?;
    let Value::Object(parameters) = value else {
        return Err(invalid("body must be a JSON object".to_string()));
    };

    if let Some((name, _)) = parameters
        .iter()
        .find(|(_, v)| v.is_object() || v.is_array())
    {
        return Err(invalid(format!("parameter '{}' is not a scalar", name)));
    }

    Ok(parameters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_property_order_is_preserved() {
        let bag = PropertyBag::from_value(json!({"Zeta": 1, "Alpha": "a", "Mid": true})).unwrap();
        let names: Vec<&str> = bag.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["Zeta", "Alpha", "Mid"]);
        assert_eq!(serde_json::to_string(&bag).unwrap(), r#"{"Zeta":1,"Alpha":"a","Mid":true}"#);
    }

    #[test]
    fn test_serialize_results_shapes() {
        let output = serialize_results(vec![
            json!({"DisplayName": "Ada", "Identity": "ada@example.com"}),
            Value::Null,
            json!("plain"),
        ])
        .unwrap();
        assert_eq!(
            output,
            r#"[{"DisplayName":"Ada","Identity":"ada@example.com"},null,{"Value":"plain"}]"#
        );
    }

    #[test]
    fn test_parse_parameters() {
        let params = parse_parameters(br#"{"Identity": "ada", "ResultSize": 10, "Archive": false}"#).unwrap();
        assert_eq!(params.len(), 3);
        assert_eq!(params["Identity"], "ada");

        assert!(parse_parameters(b"").unwrap().is_empty());
        assert!(parse_parameters(b"  \n").unwrap().is_empty());
    }

    #[test]
    fn test_rejects_non_flat_parameters() {
        let bodies: [&[u8]; 4] = [br#"[1, 2]"#, br#"{"Filter": {"Name": "x"}}"#, br#"{"Ids": [1]}"#, b"not json"];
        for body in bodies {
            let err = parse_parameters(body).unwrap_err();
            assert_eq!(err.reason, FailureReason::InvalidParameters);
        }
    }
}
