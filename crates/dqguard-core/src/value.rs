use chrono::NaiveDateTime;

/// Cell value for a dataset column.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the value; numeric-looking text is coerced.
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            Value::Int(value) => Some(*value as f64),
            Value::Float(value) => Some(*value),
            Value::Text(value) => value.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(value) => Some(*value),
            _ => None,
        }
    }

    /// Render the value as a CSV field; null becomes the empty string.
    pub fn to_field(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(value) => value.to_string(),
            Value::Int(value) => value.to_string(),
            Value::Float(value) => value.to_string(),
            Value::Text(value) => value.clone(),
            Value::Timestamp(value) => value.format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }

    /// Stable component for grouping keys; distinct from any rendered field.
    pub fn key_component(&self) -> String {
        match self {
            Value::Null => "\u{0}null".to_string(),
            other => other.to_field(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_coercion_accepts_numeric_text() {
        assert_eq!(Value::Text(" 42.5 ".to_string()).as_numeric(), Some(42.5));
        assert_eq!(Value::Int(7).as_numeric(), Some(7.0));
        assert_eq!(Value::Text("abc".to_string()).as_numeric(), None);
        assert_eq!(Value::Null.as_numeric(), None);
    }

    #[test]
    fn null_key_component_differs_from_empty_text() {
        assert_ne!(
            Value::Null.key_component(),
            Value::Text(String::new()).key_component()
        );
    }
}
