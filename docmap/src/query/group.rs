use std::fmt::{Display, Formatter};

use crate::common::{
    ACC_ADD_TO_SET, ACC_AVG, ACC_FIRST, ACC_LAST, ACC_MAX, ACC_MIN, ACC_PUSH, ACC_SUM, DOC_ID,
    FIELD_REFERENCE,
};
use crate::document::{Document, Value};
use crate::errors::{MapperError, MapperResult};

/// Builds the body of a `$group` pipeline stage: the `_id` grouping key
/// and named accumulators.
///
/// # Usage
///
/// ```rust
/// use docmap::doc;
/// use docmap::query::Group;
///
/// let group = Group::by_field("author").count("posts").sum("words", "$words");
/// assert_eq!(
///     group.to_document().unwrap(),
///     doc! { _id: "$author", posts: { "$sum": 1 }, words: { "$sum": "$words" } }
/// );
/// ```
#[derive(Debug)]
pub struct Group {
    group: Document,
    error: Option<MapperError>,
}

impl Group {
    /// Groups by `id`, any value or expression.
    pub fn new<V: Into<Value>>(id: V) -> Self {
        Group {
            group: Document::new(),
            error: None,
        }
        .put(DOC_ID, id)
    }

    /// Groups by the value of one field; the field reference sigil is added
    /// when missing.
    pub fn by_field(field: &str) -> Self {
        Group::new(field_reference(field))
    }

    /// Groups by a composite key with a first component `name: value`.
    pub fn composite<V: Into<Value>>(name: &str, value: V) -> Self {
        Group {
            group: Document::new(),
            error: None,
        }
        .composite_id(name, value)
    }

    /// Adds a component to the composite `_id`, replacing a single-value id.
    pub fn composite_id<V: Into<Value>>(self, name: &str, value: V) -> Self {
        let result = match self.group.get(DOC_ID) {
            Ok(Value::Document(id)) => id.put(name, value),
            Ok(_) => {
                let id = Document::new();
                id.put(name, value)
                    .and_then(|_| self.group.put(DOC_ID, id))
            }
            Err(e) => Err(e),
        };
        self.record(result)
    }

    pub fn put<V: Into<Value>>(self, name: &str, value: V) -> Self {
        let result = self.group.put(name, value);
        self.record(result)
    }

    fn accumulate<V: Into<Value>>(self, name: &str, accumulator: &str, value: V) -> Self {
        let expression = Document::new();
        let result = expression.put(accumulator, value);
        self.record(result).put(name, expression)
    }

    /// Counts the documents of each group: `{$sum: 1}`.
    pub fn count(self, name: &str) -> Self {
        self.accumulate(name, ACC_SUM, 1)
    }

    pub fn sum<V: Into<Value>>(self, name: &str, value: V) -> Self {
        self.accumulate(name, ACC_SUM, value)
    }

    pub fn push<V: Into<Value>>(self, name: &str, value: V) -> Self {
        self.accumulate(name, ACC_PUSH, value)
    }

    pub fn avg<V: Into<Value>>(self, name: &str, value: V) -> Self {
        self.accumulate(name, ACC_AVG, value)
    }

    pub fn min<V: Into<Value>>(self, name: &str, value: V) -> Self {
        self.accumulate(name, ACC_MIN, value)
    }

    pub fn max<V: Into<Value>>(self, name: &str, value: V) -> Self {
        self.accumulate(name, ACC_MAX, value)
    }

    pub fn first<V: Into<Value>>(self, name: &str, value: V) -> Self {
        self.accumulate(name, ACC_FIRST, value)
    }

    pub fn last<V: Into<Value>>(self, name: &str, value: V) -> Self {
        self.accumulate(name, ACC_LAST, value)
    }

    pub fn add_to_set<V: Into<Value>>(self, name: &str, value: V) -> Self {
        self.accumulate(name, ACC_ADD_TO_SET, value)
    }

    pub fn to_document(&self) -> MapperResult<Document> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        self.group.deep_copy()
    }

    fn record(mut self, result: MapperResult<()>) -> Self {
        if let Err(e) = result {
            self.error.get_or_insert(e);
        }
        self
    }
}

pub(crate) fn field_reference(field: &str) -> String {
    if field.starts_with(FIELD_REFERENCE) {
        field.to_string()
    } else {
        format!("{}{}", FIELD_REFERENCE, field)
    }
}

impl Display for Group {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.group, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    #[test]
    fn test_single_id() {
        let group = Group::new(Value::Null).count("total");
        assert_eq!(
            group.to_document().unwrap(),
            doc! { _id: (Value::Null), total: { "$sum": 1 } }
        );
        let group = Group::by_field("$tag");
        assert_eq!(group.to_document().unwrap(), doc! { _id: "$tag" });
    }

    #[test]
    fn test_composite_id() {
        let group = Group::composite("year", "$year")
            .composite_id("month", "$month")
            .avg("mean", "$score");
        assert_eq!(
            group.to_document().unwrap(),
            doc! {
                _id: { year: "$year", month: "$month" },
                mean: { "$avg": "$score" },
            }
        );
    }

    #[test]
    fn test_composite_replaces_single_id() {
        let group = Group::by_field("a").composite_id("b", "$b");
        assert_eq!(group.to_document().unwrap(), doc! { _id: { b: "$b" } });
    }

    #[test]
    fn test_accumulators() {
        let group = Group::by_field("k")
            .push("all", "$v")
            .min("lo", "$v")
            .max("hi", "$v")
            .first("head", "$v")
            .last("tail", "$v")
            .add_to_set("distinct", "$v");
        assert_eq!(
            group.to_document().unwrap(),
            doc! {
                _id: "$k",
                all: { "$push": "$v" },
                lo: { "$min": "$v" },
                hi: { "$max": "$v" },
                head: { "$first": "$v" },
                tail: { "$last": "$v" },
                distinct: { "$addToSet": "$v" },
            }
        );
    }

    #[test]
    fn test_field_reference() {
        assert_eq!(field_reference("a.b"), "$a.b");
        assert_eq!(field_reference("$a"), "$a");
    }
}
