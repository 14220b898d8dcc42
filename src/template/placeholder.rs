use crate::stack::Attribute;
use serde_json::Value;

/// Opening delimiter of a resource placeholder. The closing delimiter is `}`.
pub const PLACEHOLDER_OPEN: &str = "${ref:";

/// A parsed `${ref:<logicalId>.<Attribute>}` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub logical_id: String,
    pub attribute: Attribute,
    /// The placeholder exactly as written, delimiters included.
    pub raw: String,
}

/// A piece of text split around its placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Placeholder(Placeholder),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderSyntaxError {
    pub placeholder: String,
    pub message: String,
}

/// Splits `text` into literal text and placeholders.
///
/// Other `${...}` forms (as used by resolver template languages) are left
/// untouched as literal text.
pub fn parse_segments(text: &str) -> Result<Vec<Segment>, PlaceholderSyntaxError> {
    let mut segments = Vec::new();
    let mut remainder = text;

    while let Some(start) = remainder.find(PLACEHOLDER_OPEN) {
        if start > 0 {
            segments.push(Segment::Text(remainder[..start].to_string()));
        }
        let after_open = &remainder[start + PLACEHOLDER_OPEN.len()..];
        let Some(end) = after_open.find('}') else {
            return Err(PlaceholderSyntaxError {
                placeholder: remainder[start..].chars().take(64).collect(),
                message: "placeholder is not terminated by '}'".to_string(),
            });
        };
        let expression = &after_open[..end];
        let raw = format!("{}{}}}", PLACEHOLDER_OPEN, expression);
        segments.push(Segment::Placeholder(parse_expression(expression, raw)?));
        remainder = &after_open[end + 1..];
    }

    if !remainder.is_empty() {
        segments.push(Segment::Text(remainder.to_string()));
    }
    Ok(segments)
}

/// All placeholders in `text`, in order of appearance.
pub fn extract_placeholders(text: &str) -> Result<Vec<Placeholder>, PlaceholderSyntaxError> {
    Ok(parse_segments(text)?
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Placeholder(placeholder) => Some(placeholder),
            Segment::Text(_) => None,
        })
        .collect())
}

/// Collects the placeholders of every string in a JSON value tree.
pub fn collect_from_value(
    value: &Value,
    placeholders: &mut Vec<Placeholder>,
) -> Result<(), PlaceholderSyntaxError> {
    match value {
        Value::String(text) => placeholders.extend(extract_placeholders(text)?),
        Value::Array(values) => {
            for nested in values {
                collect_from_value(nested, placeholders)?;
            }
        }
        Value::Object(map) => {
            for nested in map.values() {
                collect_from_value(nested, placeholders)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn parse_expression(expression: &str, raw: String) -> Result<Placeholder, PlaceholderSyntaxError> {
    let Some((logical_id, attribute)) = expression.trim().rsplit_once('.') else {
        return Err(PlaceholderSyntaxError {
            placeholder: raw,
            message: "expected '<logicalId>.<Attribute>'".to_string(),
        });
    };
    if logical_id.is_empty() || !logical_id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(PlaceholderSyntaxError {
            placeholder: raw,
            message: format!("'{}' is not a valid logical id", logical_id),
        });
    }
    let Some(attribute) = Attribute::parse(attribute) else {
        return Err(PlaceholderSyntaxError {
            placeholder: raw,
            message: format!("unknown attribute '{}'", attribute),
        });
    };
    Ok(Placeholder {
        logical_id: logical_id.to_string(),
        attribute,
        raw,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn splits_text_around_placeholders() {
        let segments = parse_segments("arn=${ref:statemachineAB12CD34.Arn}!").unwrap();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], Segment::Text("arn=".to_string()));
        match &segments[1] {
            Segment::Placeholder(p) => {
                assert_eq!(p.logical_id, "statemachineAB12CD34");
                assert_eq!(p.attribute, Attribute::Arn);
                assert_eq!(p.raw, "${ref:statemachineAB12CD34.Arn}");
            }
            other => panic!("expected placeholder, got {:?}", other),
        }
        assert_eq!(segments[2], Segment::Text("!".to_string()));
    }

    #[test]
    fn leaves_foreign_interpolation_alone() {
        let text = "#set($x = ${ctx.args})$util.toJson($ctx.result)";
        let segments = parse_segments(text).unwrap();
        assert_eq!(segments, vec![Segment::Text(text.to_string())]);
    }

    #[test]
    fn reports_unterminated_and_unknown_placeholders() {
        let err = parse_segments("x ${ref:abc.Arn").unwrap_err();
        assert!(err.message.contains("not terminated"));

        let err = parse_segments("${ref:abc.Colour}").unwrap_err();
        assert!(err.message.contains("unknown attribute"));

        let err = parse_segments("${ref:Arn}").unwrap_err();
        assert!(err.message.contains("<logicalId>.<Attribute>"));
    }

    #[test]
    fn collects_from_nested_values() {
        let value = json!({
            "a": "${ref:one.Arn}",
            "b": ["plain", {"c": "x-${ref:two.Name}-y"}],
            "d": 4
        });
        let mut placeholders = Vec::new();
        collect_from_value(&value, &mut placeholders).unwrap();
        let ids: Vec<_> = placeholders.iter().map(|p| p.logical_id.as_str()).collect();
        assert_eq!(ids, vec!["one", "two"]);
    }
}
