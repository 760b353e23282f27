use schemars::schema::RootSchema;
use schemars::schema_for;

use crate::model::RuleSet;

/// Emit the JSON Schema for rule files.
pub fn rules_json_schema() -> RootSchema {
    schema_for!(RuleSet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_names_every_check_variant() {
        let schema = rules_json_schema();
        let text = serde_json::to_string(&schema).expect("serialize schema");
        for kind in ["duplicate", "null_rate", "range", "enum", "freshness"] {
            assert!(text.contains(kind), "schema is missing '{kind}'");
        }
    }
}
