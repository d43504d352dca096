use crate::common::{
    STAGE_GROUP, STAGE_LIMIT, STAGE_MATCH, STAGE_PROJECT, STAGE_SKIP, STAGE_SORT, STAGE_UNWIND,
};
use crate::document::{Document, DocumentList, Value};
use crate::errors::{ErrorKind, MapperError, MapperResult};
use crate::index::parse_fields;
use crate::query::group::field_reference;
use crate::query::{Group, Projection, Query};

/// An aggregation pipeline: an ordered list of single-key stage documents.
///
/// Stages built from arguments are validated when added; raw-document
/// variants (`*_doc`) are taken as they are.
///
/// # Usage
///
/// ```rust
/// use docmap::doc;
/// use docmap::query::{Group, Pipeline, Query};
///
/// let pipeline = Pipeline::new()
///     .match_query(&Query::new().equal("published", true)).unwrap()
///     .unwind("tags").unwrap()
///     .group(&Group::by_field("tags").count("posts")).unwrap()
///     .sort(&["-posts"]).unwrap()
///     .skip(0).unwrap()
///     .limit(10).unwrap();
/// assert_eq!(pipeline.stages().len(), 5);
/// assert_eq!(pipeline.stages()[1], doc! { "$unwind": "$tags" });
/// ```
#[derive(Debug, Default)]
pub struct Pipeline {
    stages: Vec<Document>,
}

impl Pipeline {
    pub fn new() -> Self {
        Pipeline::default()
    }

    fn stage<V: Into<Value>>(mut self, name: &str, argument: V) -> MapperResult<Self> {
        let stage = Document::new();
        stage.put(name, argument)?;
        self.stages.push(stage);
        Ok(self)
    }

    /// `$project` over field-sign tokens.
    ///
    /// # Errors
    /// `ValidationError` for an empty field list or an empty token.
    pub fn project<S: AsRef<str>>(self, fields: &[S]) -> MapperResult<Self> {
        let fields = non_empty(STAGE_PROJECT, fields)?;
        self.stage(STAGE_PROJECT, parse_fields(fields)?)
    }

    pub fn project_with(self, projection: &Projection) -> MapperResult<Self> {
        self.stage(STAGE_PROJECT, projection.to_document()?)
    }

    pub fn project_doc(self, projection: Document) -> MapperResult<Self> {
        self.stage(STAGE_PROJECT, projection)
    }

    pub fn match_query(self, query: &Query) -> MapperResult<Self> {
        self.stage(STAGE_MATCH, query.to_document()?)
    }

    pub fn match_doc(self, query: Document) -> MapperResult<Self> {
        self.stage(STAGE_MATCH, query)
    }

    /// `$limit`; the limit must be positive.
    pub fn limit(self, limit: i64) -> MapperResult<Self> {
        if limit <= 0 {
            log::error!("Pipeline limit must be positive, got {}", limit);
            return Err(MapperError::new(
                &format!("Pipeline limit must be positive, got {}", limit),
                ErrorKind::ValidationError,
            ));
        }
        self.stage(STAGE_LIMIT, limit)
    }

    /// `$skip`; skipping nothing adds no stage.
    pub fn skip(self, skip: i64) -> MapperResult<Self> {
        if skip < 0 {
            log::error!("Pipeline skip cannot be negative, got {}", skip);
            return Err(MapperError::new(
                &format!("Pipeline skip cannot be negative, got {}", skip),
                ErrorKind::ValidationError,
            ));
        }
        if skip == 0 {
            return Ok(self);
        }
        self.stage(STAGE_SKIP, skip)
    }

    /// `$unwind` of a list field; the field reference sigil is added when
    /// missing.
    pub fn unwind(self, field: &str) -> MapperResult<Self> {
        if field.is_empty() {
            log::error!("Pipeline unwind needs a field");
            return Err(MapperError::new(
                "Pipeline unwind needs a field",
                ErrorKind::ValidationError,
            ));
        }
        self.stage(STAGE_UNWIND, field_reference(field))
    }

    pub fn group(self, group: &Group) -> MapperResult<Self> {
        self.stage(STAGE_GROUP, group.to_document()?)
    }

    pub fn group_doc(self, group: Document) -> MapperResult<Self> {
        self.stage(STAGE_GROUP, group)
    }

    /// `$sort` over field-sign tokens.
    ///
    /// # Errors
    /// `ValidationError` for an empty field list or an empty token.
    pub fn sort<S: AsRef<str>>(self, fields: &[S]) -> MapperResult<Self> {
        let fields = non_empty(STAGE_SORT, fields)?;
        self.stage(STAGE_SORT, parse_fields(fields)?)
    }

    pub fn sort_doc(self, sort: Document) -> MapperResult<Self> {
        self.stage(STAGE_SORT, sort)
    }

    pub fn stages(&self) -> &[Document] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// The stages as a list value, the shape of an `aggregate` command's
    /// `pipeline` argument.
    pub fn to_list(&self) -> DocumentList {
        self.stages.iter().cloned().map(Value::Document).collect()
    }
}

fn non_empty<'a, S: AsRef<str>>(stage: &str, fields: &'a [S]) -> MapperResult<&'a [S]> {
    if fields.is_empty() {
        log::error!("Pipeline stage {} needs at least one field", stage);
        return Err(MapperError::new(
            &format!("Pipeline stage {} needs at least one field", stage),
            ErrorKind::ValidationError,
        ));
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    #[test]
    fn test_skip_zero_is_elided() {
        let pipeline = Pipeline::new().skip(0).unwrap();
        assert!(pipeline.is_empty());
        let pipeline = pipeline.skip(5).unwrap();
        assert_eq!(pipeline.stages(), &[doc! { "$skip": 5i64 }]);
    }

    #[test]
    fn test_invalid_limit_and_skip() {
        for limit in [0, -1] {
            let err = Pipeline::new().limit(limit).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::ValidationError);
        }
        assert!(Pipeline::new().skip(-1).is_err());
    }

    #[test]
    fn test_unwind_prefix() {
        let pipeline = Pipeline::new().unwind("tags").unwrap().unwind("$items").unwrap();
        assert_eq!(
            pipeline.stages(),
            &[doc! { "$unwind": "$tags" }, doc! { "$unwind": "$items" }]
        );
        assert!(Pipeline::new().unwind("").is_err());
    }

    #[test]
    fn test_sort_and_project_tokens() {
        let pipeline = Pipeline::new()
            .sort(&["-date", "title"])
            .unwrap()
            .project(&["title", "-_id"])
            .unwrap();
        assert_eq!(
            pipeline.stages(),
            &[
                doc! { "$sort": { date: (-1), title: 1 } },
                doc! { "$project": { title: 1, _id: (-1) } },
            ]
        );
        let empty: [&str; 0] = [];
        assert!(Pipeline::new().sort(&empty).is_err());
        assert!(Pipeline::new().project(&empty).is_err());
    }

    #[test]
    fn test_builders_as_stages() {
        let pipeline = Pipeline::new()
            .match_query(&Query::new().greater("age", 18))
            .unwrap()
            .project_with(&Projection::of(&["name"]).put("adult", true))
            .unwrap()
            .group(&Group::by_field("city").count("people"))
            .unwrap()
            .limit(3)
            .unwrap();
        assert_eq!(
            pipeline.to_list(),
            DocumentList::from_values(vec![
                Value::Document(doc! { "$match": { age: { "$gt": 18 } } }),
                Value::Document(doc! { "$project": { name: 1, adult: true } }),
                Value::Document(doc! { "$group": { _id: "$city", people: { "$sum": 1 } } }),
                Value::Document(doc! { "$limit": 3i64 }),
            ])
        );
    }

    #[test]
    fn test_raw_stages() {
        let pipeline = Pipeline::new()
            .match_doc(doc! { a: 1 })
            .unwrap()
            .sort_doc(doc! { a: 1 })
            .unwrap()
            .group_doc(doc! { _id: "$a" })
            .unwrap()
            .project_doc(doc! { a: 1 })
            .unwrap();
        assert_eq!(pipeline.stages().len(), 4);
    }
}
