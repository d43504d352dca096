use std::fmt::{Display, Formatter};

use crate::document::{Document, Value};
use crate::errors::{MapperError, MapperResult};
use crate::index::parse_field;

/// Builds a projection: field-sign tokens for inclusion (`"a"`, `"+a"`)
/// or exclusion (`"-a"`), plus computed entries for aggregation pipelines.
#[derive(Debug, Default)]
pub struct Projection {
    projection: Document,
    error: Option<MapperError>,
}

impl Projection {
    pub fn new() -> Self {
        Projection::default()
    }

    pub fn of<S: AsRef<str>>(fields: &[S]) -> Self {
        Projection::new().add(fields)
    }

    pub fn add<S: AsRef<str>>(mut self, fields: &[S]) -> Self {
        for token in fields {
            let result = parse_field(token.as_ref())
                .and_then(|(field, order)| self.projection.put(field, order.direction()));
            if let Err(e) = result {
                self.error.get_or_insert(e);
                break;
            }
        }
        self
    }

    /// Maps a field to an expression; pipelines only.
    pub fn put<V: Into<Value>>(mut self, name: &str, value: V) -> Self {
        if let Err(e) = self.projection.put(name, value) {
            self.error.get_or_insert(e);
        }
        self
    }

    pub fn to_document(&self) -> MapperResult<Document> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        self.projection.deep_copy()
    }
}

impl Display for Projection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.projection, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;
    use crate::errors::ErrorKind;

    #[test]
    fn test_sign_tokens() {
        let projection = Projection::of(&["name", "+age", "-_id"]);
        assert_eq!(
            projection.to_document().unwrap(),
            doc! { name: 1, age: 1, _id: (-1) }
        );
    }

    #[test]
    fn test_computed_entries() {
        let projection = Projection::new().add(&["title"]).put("author", "$author.name");
        assert_eq!(
            projection.to_document().unwrap(),
            doc! { title: 1, author: "$author.name" }
        );
    }

    #[test]
    fn test_empty_token() {
        let err = Projection::of(&["a", "-"]).to_document().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ValidationError);
    }
}
