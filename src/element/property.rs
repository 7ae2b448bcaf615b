//! Typed element properties and attribute coercion.
//!
//! Attributes always arrive as strings; a [`PropDefinition`] turns them (or
//! any other value) into the shape its type expects. Coercion never fails:
//! malformed input degrades to the type's empty value.

use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::data::{Map, Value};

const LIST_DELIMITER: char = ',';
const PAIR_DELIMITER: char = ':';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropType {
    String,
    Boolean,
    Number,
    Array,
    Object,
}

/// Custom conversion, replacing the built-in rules entirely.
pub type Converter = Rc<dyn Fn(&Value) -> Value>;

#[derive(Clone, Default)]
pub struct PropDefinition {
    kind: Option<PropType>,
    default: Option<Value>,
    allow_null: bool,
    sub: Option<Box<PropDefinition>>,
    convert: Option<Converter>,
}

impl fmt::Debug for PropDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropDefinition")
            .field("kind", &self.kind)
            .field("default", &self.default)
            .field("allow_null", &self.allow_null)
            .field("sub", &self.sub)
            .field("convert", &self.convert.is_some())
            .finish()
    }
}

impl PropDefinition {
    pub fn new(kind: PropType) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    /// A property with no type: values pass through unchanged.
    pub fn untyped() -> Self {
        Self::default()
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn allow_null(mut self) -> Self {
        self.allow_null = true;
        self
    }

    /// Element type for `Array` and value type for `Object`.
    pub fn with_sub(mut self, sub: PropDefinition) -> Self {
        self.sub = Some(Box::new(sub));
        self
    }

    pub fn with_converter(mut self, convert: impl Fn(&Value) -> Value + 'static) -> Self {
        self.convert = Some(Rc::new(convert));
        self
    }

    pub fn kind(&self) -> Option<PropType> {
        self.kind
    }

    /// Initial value: the explicit default, else the empty value of the type.
    pub fn default_value(&self) -> Value {
        if let Some(default) = &self.default {
            return default.clone();
        }
        match self.kind {
            Some(PropType::String) => Value::from(""),
            Some(PropType::Boolean) => Value::Bool(false),
            Some(PropType::Number) => Value::Number(0.0),
            Some(PropType::Array) => Value::array(Vec::<Value>::new()),
            Some(PropType::Object) => Value::from(Map::new()),
            None => Value::Undefined,
        }
    }

    pub fn convert(&self, value: &Value) -> Value {
        if let Some(convert) = &self.convert {
            return convert(value);
        }
        if self.allow_null && value.is_nullish() {
            return Value::Null;
        }
        match self.kind {
            Some(PropType::String) => to_string(value),
            Some(PropType::Boolean) => to_boolean(value),
            Some(PropType::Number) => to_number(value),
            Some(PropType::Array) => self.to_array(value),
            Some(PropType::Object) => self.to_object(value),
            None => value.clone(),
        }
    }

    fn convert_sub(&self, value: &Value) -> Value {
        match &self.sub {
            Some(sub) => sub.convert(value),
            None => value.clone(),
        }
    }

    fn to_array(&self, value: &Value) -> Value {
        let parsed = match value.as_str() {
            Some(text) if text.starts_with('[') => parse_json(text),
            Some(text) => Value::array(text.split(LIST_DELIMITER)),
            None => value.clone(),
        };
        match parsed.as_array() {
            Some(items) => Value::array(items.iter().map(|item| self.convert_sub(item))),
            None => Value::array(Vec::<Value>::new()),
        }
    }

    fn to_object(&self, value: &Value) -> Value {
        let parsed = match value.as_str() {
            Some(text) if text.starts_with('{') => parse_json(text),
            Some(text) => Value::map(text.split(LIST_DELIMITER).map(|part| {
                let mut pieces = part.splitn(3, PAIR_DELIMITER);
                let key = pieces.next().unwrap_or_default().to_string();
                (key, pieces.next().map(Value::from).unwrap_or(Value::Undefined))
            })),
            None => value.clone(),
        };
        match parsed.as_map() {
            Some(map) => Value::map(
                map.iter()
                    .map(|(key, item)| (key.clone(), self.convert_sub(item))),
            ),
            None => Value::from(Map::new()),
        }
    }
}

/// Parse JSON, leaving the raw string in place when it is malformed.
fn parse_json(text: &str) -> Value {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(json) => Value::from(json),
        Err(err) => {
            trace!(%err, "malformed serialized property, using fallback");
            Value::from(text)
        }
    }
}

fn to_string(value: &Value) -> Value {
    if value.is_nullish() {
        return Value::from("");
    }
    Value::from(value.to_display_string())
}

fn to_boolean(value: &Value) -> Value {
    // A present but empty attribute means true.
    if value.as_str() == Some("") {
        return Value::Bool(true);
    }
    Value::Bool(value.is_truthy())
}

fn to_number(value: &Value) -> Value {
    let number = match value {
        Value::Number(n) => *n,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::String(text) => {
            let text = text.trim();
            if text.is_empty() {
                0.0
            } else {
                text.parse::<f64>().unwrap_or(0.0)
            }
        }
        _ => 0.0,
    };
    Value::Number(if number.is_nan() { 0.0 } else { number })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(value: &Value) -> Vec<String> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(Value::to_display_string)
            .collect()
    }

    #[test]
    fn test_defaults_per_type() {
        assert_eq!(PropDefinition::new(PropType::String).default_value().as_str(), Some(""));
        assert_eq!(PropDefinition::new(PropType::Boolean).default_value().as_bool(), Some(false));
        assert_eq!(PropDefinition::new(PropType::Number).default_value().as_f64(), Some(0.0));
        assert!(PropDefinition::new(PropType::Array).default_value().as_array().unwrap().is_empty());
        assert!(PropDefinition::new(PropType::Object).default_value().as_map().unwrap().is_empty());
        assert!(PropDefinition::untyped().default_value().is_undefined());
        assert_eq!(
            PropDefinition::new(PropType::Number).with_default(3).default_value().as_f64(),
            Some(3.0)
        );
    }

    #[test]
    fn test_primitive_coercion() {
        let string = PropDefinition::new(PropType::String);
        assert_eq!(string.convert(&Value::Null).as_str(), Some(""));
        assert_eq!(string.convert(&Value::from(4)).as_str(), Some("4"));

        let boolean = PropDefinition::new(PropType::Boolean);
        assert_eq!(boolean.convert(&Value::from("")).as_bool(), Some(true));
        assert_eq!(boolean.convert(&Value::Null).as_bool(), Some(false));
        assert_eq!(boolean.convert(&Value::from("off")).as_bool(), Some(true));

        let number = PropDefinition::new(PropType::Number);
        assert_eq!(number.convert(&Value::from(" 2.5 ")).as_f64(), Some(2.5));
        assert_eq!(number.convert(&Value::from("abc")).as_f64(), Some(0.0));
        assert_eq!(number.convert(&Value::Bool(true)).as_f64(), Some(1.0));
    }

    #[test]
    fn test_allow_null() {
        let prop = PropDefinition::new(PropType::String).allow_null();
        assert!(matches!(prop.convert(&Value::Null), Value::Null));
        assert!(matches!(prop.convert(&Value::Undefined), Value::Null));
    }

    #[test]
    fn test_array_from_json_and_delimiters() {
        let prop = PropDefinition::new(PropType::Array);
        assert_eq!(strings(&prop.convert(&Value::from("[1, \"two\"]"))), vec!["1", "two"]);
        assert_eq!(strings(&prop.convert(&Value::from("a,b,c"))), vec!["a", "b", "c"]);
        assert!(prop.convert(&Value::from("[broken")).as_array().unwrap().is_empty());
        assert!(prop.convert(&Value::from(7)).as_array().unwrap().is_empty());
    }

    #[test]
    fn test_array_sub_type() {
        let prop = PropDefinition::new(PropType::Array).with_sub(PropDefinition::new(PropType::Number));
        let converted = prop.convert(&Value::from("1,2,x"));
        let numbers: Vec<f64> = converted
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_f64)
            .collect();
        assert_eq!(numbers, vec![1.0, 2.0, 0.0]);
    }

    #[test]
    fn test_object_from_json_and_pairs() {
        let prop = PropDefinition::new(PropType::Object);
        let parsed = prop.convert(&Value::from("{\"a\": 1}"));
        assert_eq!(parsed.get("a").as_f64(), Some(1.0));

        let pairs = prop.convert(&Value::from("a:1,b:2:3,c"));
        assert_eq!(pairs.get("a").as_str(), Some("1"));
        assert_eq!(pairs.get("b").as_str(), Some("2"));
        assert!(pairs.get("c").is_undefined());
        assert!(pairs.as_map().unwrap().contains_key("c"));

        assert!(prop.convert(&Value::from("{nope")).as_map().unwrap().is_empty());
    }

    #[test]
    fn test_custom_converter_wins() {
        let prop = PropDefinition::new(PropType::Number)
            .allow_null()
            .with_converter(|value| Value::from(format!("<{}>", value.to_display_string())));
        assert_eq!(prop.convert(&Value::from("hi")).as_str(), Some("<hi>"));
        assert_eq!(prop.convert(&Value::Null).as_str(), Some("<>"));
    }
}
