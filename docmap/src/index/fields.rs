use crate::document::{Document, Value};
use crate::errors::{ErrorKind, MapperError, MapperResult};

/// Sort direction of one key of an index or a sort/projection stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    /// `1` for ascending and `-1` for descending.
    pub fn direction(&self) -> i32 {
        match self {
            SortOrder::Ascending => 1,
            SortOrder::Descending => -1,
        }
    }
}

/// Splits a field-sign token into its field name and order.
///
/// `"-field"` is descending, `"+field"` and a bare `"field"` are ascending.
pub fn parse_field(token: &str) -> MapperResult<(String, SortOrder)> {
    let token = token.trim();
    let (field, order) = match token.as_bytes().first() {
        Some(b'-') => (&token[1..], SortOrder::Descending),
        Some(b'+') => (&token[1..], SortOrder::Ascending),
        _ => (token, SortOrder::Ascending),
    };
    if field.is_empty() {
        log::error!("Empty field in field list token '{}'", token);
        return Err(MapperError::new(
            &format!("Empty field in field list token '{}'", token),
            ErrorKind::ValidationError,
        ));
    }
    Ok((field.to_string(), order))
}

/// Parses field-sign tokens into an ordered `field -> direction` document.
///
/// # Examples
///
/// ```rust
/// use docmap::index::parse_fields;
/// use docmap::doc;
///
/// let keys = parse_fields(&["-x", "y"]).unwrap();
/// assert_eq!(keys, doc! { x: (-1), y: 1 });
/// ```
pub fn parse_fields<S: AsRef<str>>(fields: &[S]) -> MapperResult<Document> {
    let keys = Document::new();
    for token in fields {
        let (field, order) = parse_field(token.as_ref())?;
        keys.put(field, order.direction())?;
    }
    Ok(keys)
}

/// Derives the store's canonical name for an index with the given keys.
///
/// For every key, in order, `<field>_<value>` where the value is rendered as
/// text with spaces replaced by underscores; values that are neither numbers
/// nor strings render as nothing. The pieces are joined with `_`.
pub fn generate_index_name(keys: &Document) -> MapperResult<String> {
    let mut name = String::new();
    for (field, value) in keys.entries()? {
        if !name.is_empty() {
            name.push('_');
        }
        name.push_str(&field);
        name.push('_');
        let rendered = match &value {
            Value::I32(v) => v.to_string(),
            Value::I64(v) => v.to_string(),
            Value::F64(v) => render_double(*v),
            Value::String(v) => v.clone(),
            _ => String::new(),
        };
        name.push_str(&rendered.replace(' ', "_"));
    }
    Ok(name)
}

// Matches the textual form the store uses for doubles: always a fractional
// part, scientific notation outside [1e-3, 1e7).
fn render_double(v: f64) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let magnitude = v.abs();
    if v == 0.0 || (1e-3..1e7).contains(&magnitude) {
        let text = v.to_string();
        if text.contains('.') {
            text
        } else {
            format!("{}.0", text)
        }
    } else {
        let text = format!("{:E}", v);
        match text.split_once('E') {
            Some((mantissa, exponent)) if !mantissa.contains('.') => {
                format!("{}.0E{}", mantissa, exponent)
            }
            _ => text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    #[test]
    fn test_parse_fields() {
        let keys = parse_fields(&["-x", "+y", "z"]).unwrap();
        assert_eq!(keys, doc! { x: (-1), y: 1, z: 1 });
        assert_eq!(keys.keys().unwrap(), vec!["x", "y", "z"]);
    }

    #[test]
    fn test_parse_fields_rejects_empty() {
        let err = parse_fields(&["-"]).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ValidationError);
        assert!(parse_fields(&[""]).is_err());
    }

    #[test]
    fn test_generated_name() {
        let keys = parse_fields(&["-x", "y"]).unwrap();
        assert_eq!(generate_index_name(&keys).unwrap(), "x_-1_y_1");
    }

    #[test]
    fn test_generated_name_for_text_and_odd_values() {
        let keys = doc! { title: "text", loc: "2d sphere", flag: true, w: 1.0 };
        assert_eq!(
            generate_index_name(&keys).unwrap(),
            "title_text_loc_2d_sphere_flag__w_1.0"
        );
    }

    #[test]
    fn test_render_double() {
        assert_eq!(render_double(2.5), "2.5");
        assert_eq!(render_double(-3.0), "-3.0");
        assert_eq!(render_double(1e7), "1.0E7");
        assert_eq!(render_double(0.0), "0.0");
    }
}
