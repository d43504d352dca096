use std::fmt::{Display, Formatter};

use crate::document::{Document, DocumentList, Value};
use crate::errors::{ErrorKind, MapperError, MapperResult};
use crate::query::Operator;

/// Builds a query condition document.
///
/// An equality condition stores the value directly under the field. Any
/// other operator stores `{<symbol>: value}` under the field, and further
/// operators on the same field join that document (the last value per
/// symbol wins).
///
/// Setters never fail on their own: the first error (an empty field name)
/// is kept and returned by [`Query::to_document`]. The string form
/// [`Query::filter`] fails immediately on an unknown operator.
///
/// # Usage
///
/// ```rust
/// use docmap::doc;
/// use docmap::query::Query;
///
/// let query = Query::new()
///     .filter("age >", 5).unwrap()
///     .filter("age <", 10).unwrap()
///     .equal("active", true);
/// assert_eq!(
///     query.to_document().unwrap(),
///     doc! { age: { "$gt": 5, "$lt": 10 }, active: true }
/// );
/// ```
#[derive(Debug, Default)]
pub struct Query {
    conditions: Document,
    error: Option<MapperError>,
}

impl Query {
    pub fn new() -> Self {
        Query::default()
    }

    /// Adds a condition written as `"field"` or `"field <op>"`.
    ///
    /// # Errors
    /// `UnknownOperator` if the operator token is not recognized, or the
    /// condition has other than one or two whitespace-separated parts.
    pub fn filter<V: Into<Value>>(self, condition: &str, value: V) -> MapperResult<Self> {
        let parts: Vec<&str> = condition.split_whitespace().collect();
        let (field, operator) = match parts.as_slice() {
            [field] => (*field, Operator::Equal),
            [field, token] => (*field, Operator::from_token(token)?),
            _ => {
                log::error!("'{}' is not a legal filter condition", condition);
                return Err(MapperError::new(
                    &format!("'{}' is not a legal filter condition", condition),
                    ErrorKind::UnknownOperator,
                ));
            }
        };
        Ok(self.filter_op(field, operator, value))
    }

    /// Adds `field <operator> value`.
    pub fn filter_op<V: Into<Value>>(mut self, field: &str, operator: Operator, value: V) -> Self {
        if self.error.is_some() {
            return self;
        }
        if let Err(e) = self.put_condition(field, operator, value.into()) {
            self.error = Some(e);
        }
        self
    }

    fn put_condition(&self, field: &str, operator: Operator, value: Value) -> MapperResult<()> {
        if operator == Operator::Equal {
            return self.conditions.put(field, value);
        }
        match self.conditions.get(field)? {
            Value::Document(operators) => operators.put(operator.symbol(), value),
            _ => {
                let operators = Document::new();
                operators.put(operator.symbol(), value)?;
                self.conditions.put(field, operators)
            }
        }
    }

    pub fn equal<V: Into<Value>>(self, field: &str, value: V) -> Self {
        self.filter_op(field, Operator::Equal, value)
    }

    pub fn not_equal<V: Into<Value>>(self, field: &str, value: V) -> Self {
        self.filter_op(field, Operator::NotEqual, value)
    }

    pub fn greater<V: Into<Value>>(self, field: &str, value: V) -> Self {
        self.filter_op(field, Operator::GreaterThan, value)
    }

    pub fn greater_or_equal<V: Into<Value>>(self, field: &str, value: V) -> Self {
        self.filter_op(field, Operator::GreaterThanOrEqual, value)
    }

    pub fn less<V: Into<Value>>(self, field: &str, value: V) -> Self {
        self.filter_op(field, Operator::LessThan, value)
    }

    pub fn less_or_equal<V: Into<Value>>(self, field: &str, value: V) -> Self {
        self.filter_op(field, Operator::LessThanOrEqual, value)
    }

    pub fn exists(self, field: &str) -> Self {
        self.filter_op(field, Operator::Exists, true)
    }

    pub fn not_exists(self, field: &str) -> Self {
        self.filter_op(field, Operator::Exists, false)
    }

    pub fn is_in<I, V>(self, field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.filter_op(field, Operator::In, list_of(values))
    }

    pub fn not_in<I, V>(self, field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.filter_op(field, Operator::NotIn, list_of(values))
    }

    pub fn all<I, V>(self, field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.filter_op(field, Operator::All, list_of(values))
    }

    /// Matches list elements against a nested condition.
    pub fn elem_match(self, field: &str, condition: &Query) -> Self {
        match condition.to_document() {
            Ok(condition) => self.filter_op(field, Operator::ElementMatch, condition),
            Err(e) => self.fail(e),
        }
    }

    pub fn size(self, field: &str, size: i32) -> Self {
        self.filter_op(field, Operator::Size, size)
    }

    fn fail(mut self, error: MapperError) -> Self {
        if self.error.is_none() {
            self.error = Some(error);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty().unwrap_or(true)
    }

    /// A copy of the condition document.
    ///
    /// # Errors
    /// The first error recorded while building.
    pub fn to_document(&self) -> MapperResult<Document> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        self.conditions.deep_copy()
    }
}

fn list_of<I, V>(values: I) -> DocumentList
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    DocumentList::from_values(values.into_iter().map(Into::into).collect())
}

impl Display for Query {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.conditions, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    #[test]
    fn test_operators_on_one_field_accumulate() {
        let query = Query::new()
            .filter("age > ", 5)
            .unwrap()
            .filter("age <", 10)
            .unwrap();
        assert_eq!(
            query.to_document().unwrap(),
            doc! { age: { "$gt": 5, "$lt": 10 } }
        );
    }

    #[test]
    fn test_last_value_per_operator_wins() {
        let query = Query::new().greater("age", 5).greater("age", 7);
        assert_eq!(query.to_document().unwrap(), doc! { age: { "$gt": 7 } });
    }

    #[test]
    fn test_equal_stores_value_directly() {
        let query = Query::new().filter("name", "Ada").unwrap().equal("age", 36);
        assert_eq!(query.to_document().unwrap(), doc! { name: "Ada", age: 36 });
    }

    #[test]
    fn test_operator_replaces_scalar_equality() {
        let query = Query::new().equal("age", 3).less("age", 10);
        assert_eq!(query.to_document().unwrap(), doc! { age: { "$lt": 10 } });
    }

    #[test]
    fn test_unknown_operator_fails_immediately() {
        let err = Query::new().filter("age ~", 5).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::UnknownOperator);

        let err = Query::new().filter("age > 5", 5).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::UnknownOperator);
        assert!(Query::new().filter("  ", 5).is_err());
    }

    #[test]
    fn test_typed_helpers() {
        let query = Query::new()
            .exists("email")
            .not_exists("deleted")
            .is_in("role", ["admin", "owner"])
            .not_equal("name", "root")
            .size("tags", 2)
            .greater_or_equal("score", 1.5)
            .less_or_equal("score", 9.5);
        assert_eq!(
            query.to_document().unwrap(),
            doc! {
                email: { "$exists": true },
                deleted: { "$exists": false },
                role: { "$in": ["admin", "owner"] },
                name: { "$ne": "root" },
                tags: { "$size": 2 },
                score: { "$gte": 1.5, "$lte": 9.5 },
            }
        );
    }

    #[test]
    fn test_elem_match() {
        let inner = Query::new().equal("kind", "home").greater("rank", 1);
        let query = Query::new().elem_match("addresses", &inner);
        assert_eq!(
            query.to_document().unwrap(),
            doc! { addresses: { "$elemMatch": { kind: "home", rank: { "$gt": 1 } } } }
        );
    }

    #[test]
    fn test_error_is_deferred_for_setters() {
        let query = Query::new().equal("", 1).equal("a", 2);
        assert_eq!(query.to_document().unwrap_err().kind(), &ErrorKind::InvalidKey);
    }

    #[test]
    fn test_to_document_is_a_copy() {
        let query = Query::new().greater("a", 1);
        let document = query.to_document().unwrap();
        document.dot_put("a.$lt", 5).unwrap();
        assert_eq!(query.to_document().unwrap(), doc! { a: { "$gt": 1 } });
    }
}
