use crate::common::{
    DEFAULT_TEXT_WEIGHT, INDEX_LANGUAGE, INDEX_NAME, INDEX_SPARSE, INDEX_UNIQUE, INDEX_WEIGHTS,
    TEXT_INDEX_KIND,
};
use crate::document::{Document, Value};
use crate::errors::{ErrorKind, MapperError, MapperResult};
use crate::index::{generate_index_name, parse_fields, IndexDecl, TextIndexDecl};

/// A derived index: the key document and the options document handed to
/// the store's `ensure_index`.
///
/// An `IndexSpec` is plain data; [`IndexSpec::keys_document`] and
/// [`IndexSpec::options_document`] build fresh documents on every call.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSpec {
    keys: Vec<(String, Value)>,
    name: String,
    unique: bool,
    sparse: bool,
    language: Option<String>,
    weights: Vec<(String, i32)>,
}

impl IndexSpec {
    /// Derives a regular index from field-sign tokens.
    ///
    /// # Arguments
    /// * `name` - explicit index name; `None` or empty derives the canonical name
    /// * `fields` - field-sign tokens, `"-x"` descending, `"x"`/`"+x"` ascending
    /// * `unique`, `sparse` - index flags, written to the options only when set
    ///
    /// # Errors
    /// `ValidationError` for an empty field token.
    pub fn new<S: AsRef<str>>(
        name: Option<&str>,
        fields: &[S],
        unique: bool,
        sparse: bool,
    ) -> MapperResult<IndexSpec> {
        let keys = parse_fields(fields)?;
        let name = match name {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => generate_index_name(&keys)?,
        };
        Ok(IndexSpec {
            keys: keys.entries()?,
            name,
            unique,
            sparse,
            language: None,
            weights: Vec::new(),
        })
    }

    /// Derives a text index from fields optionally suffixed with `:<weight>`.
    ///
    /// Every field maps to `"text"` in the keys. Weights other than the
    /// default of 1 are collected into a `weights` option.
    ///
    /// # Errors
    /// `ValidationError` for an empty field or a weight that is not a
    /// positive integer.
    pub fn text<S: AsRef<str>>(
        name: Option<&str>,
        fields: &[S],
        language: Option<&str>,
    ) -> MapperResult<IndexSpec> {
        let mut keys = Vec::with_capacity(fields.len());
        let mut weights = Vec::new();
        for token in fields {
            let (field, weight) = parse_weighted(token.as_ref())?;
            if weight != DEFAULT_TEXT_WEIGHT {
                weights.push((field.clone(), weight));
            }
            keys.push((field, Value::from(TEXT_INDEX_KIND)));
        }

        let name = match name {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                let key_document: Document = keys.iter().cloned().collect();
                generate_index_name(&key_document)?
            }
        };
        Ok(IndexSpec {
            keys,
            name,
            unique: false,
            sparse: false,
            language: language.filter(|l| !l.is_empty()).map(str::to_string),
            weights,
        })
    }

    pub fn from_decl(decl: &IndexDecl) -> MapperResult<IndexSpec> {
        IndexSpec::new(decl.get_name(), decl.fields(), decl.is_unique(), decl.is_sparse())
    }

    pub fn from_text_decl(decl: &TextIndexDecl) -> MapperResult<IndexSpec> {
        IndexSpec::text(decl.get_name(), decl.fields(), decl.get_language())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn is_sparse(&self) -> bool {
        self.sparse
    }

    pub fn is_text(&self) -> bool {
        self.keys
            .iter()
            .any(|(_, v)| v.as_str() == Some(TEXT_INDEX_KIND))
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// Ordered `field -> direction` (or `field -> "text"`).
    pub fn keys_document(&self) -> Document {
        self.keys.iter().cloned().collect()
    }

    /// `unique`, `sparse`, `name`, then `language` and `weights` for text indexes.
    pub fn options_document(&self) -> Document {
        let mut options: Vec<(String, Value)> = Vec::new();
        if self.unique {
            options.push((INDEX_UNIQUE.to_string(), Value::Bool(true)));
        }
        if self.sparse {
            options.push((INDEX_SPARSE.to_string(), Value::Bool(true)));
        }
        options.push((INDEX_NAME.to_string(), Value::from(self.name.as_str())));
        if let Some(language) = &self.language {
            options.push((INDEX_LANGUAGE.to_string(), Value::from(language.as_str())));
        }
        if !self.weights.is_empty() {
            let weights: Document = self.weights.iter().cloned().collect();
            options.push((INDEX_WEIGHTS.to_string(), Value::Document(weights)));
        }
        options.into_iter().collect()
    }
}

fn parse_weighted(token: &str) -> MapperResult<(String, i32)> {
    let token = token.trim();
    let (field, weight) = match token.split_once(':') {
        None => (token, DEFAULT_TEXT_WEIGHT),
        Some((field, weight)) => match weight.trim().parse::<i32>() {
            Ok(weight) if weight > 0 => (field.trim(), weight),
            _ => {
                log::error!("Invalid text index weight in '{}'", token);
                return Err(MapperError::new(
                    &format!("Invalid text index weight in '{}'", token),
                    ErrorKind::ValidationError,
                ));
            }
        },
    };
    if field.is_empty() {
        log::error!("Empty field in text index token '{}'", token);
        return Err(MapperError::new(
            &format!("Empty field in text index token '{}'", token),
            ErrorKind::ValidationError,
        ));
    }
    Ok((field.to_string(), weight))
}
