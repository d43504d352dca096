use crate::index::SortOrder;

/// Declares a compound index on an entity.
///
/// IndexDecl is the type-level index declaration collected into an entity's
/// schema. Each field is a field-sign token: `"-field"` for descending,
/// `"+field"` or `"field"` for ascending.
///
/// # Characteristics
/// - **Named or derived**: without an explicit name, the store's canonical
///   name is derived from the keys (`x_-1_y_1`)
/// - **Flags**: `unique` and `sparse` only appear in the options when set
///
/// # Usage
///
/// ```ignore
/// builder.index(IndexDecl::new(&["-created", "author"]).unique());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexDecl {
    name: Option<String>,
    fields: Vec<String>,
    unique: bool,
    sparse: bool,
}

impl IndexDecl {
    /// Creates a declaration over the given field-sign tokens.
    ///
    /// # Arguments
    /// * `fields` - field-sign tokens in key order
    ///
    /// # Returns
    /// A non-unique, non-sparse declaration with a derived name.
    pub fn new<S: AsRef<str>>(fields: &[S]) -> Self {
        IndexDecl {
            fields: fields.iter().map(|f| f.as_ref().to_string()).collect(),
            ..IndexDecl::default()
        }
    }

    /// Sets an explicit index name; an empty name means "derive it".
    pub fn name(mut self, name: &str) -> Self {
        self.name = if name.is_empty() { None } else { Some(name.to_string()) };
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn sparse(mut self) -> Self {
        self.sparse = true;
        self
    }

    pub fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn is_sparse(&self) -> bool {
        self.sparse
    }
}

/// Declares a single-field index on the field it is attached to.
///
/// The key is the field's storage name, prefixed with `-` when the order is
/// descending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexedDecl {
    name: Option<String>,
    order: SortOrder,
    unique: bool,
    sparse: bool,
}

impl IndexedDecl {
    pub fn new() -> Self {
        IndexedDecl::default()
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = if name.is_empty() { None } else { Some(name.to_string()) };
        self
    }

    pub fn descending(mut self) -> Self {
        self.order = SortOrder::Descending;
        self
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn sparse(mut self) -> Self {
        self.sparse = true;
        self
    }

    /// The equivalent type-level declaration for a field stored as `storage_name`.
    pub fn for_field(&self, storage_name: &str) -> IndexDecl {
        let token = match self.order {
            SortOrder::Ascending => storage_name.to_string(),
            SortOrder::Descending => format!("-{}", storage_name),
        };
        IndexDecl {
            name: self.name.clone(),
            fields: vec![token],
            unique: self.unique,
            sparse: self.sparse,
        }
    }
}

/// Declares a text index.
///
/// Fields may carry a weight suffix, `"title:10"`; a field without one has
/// the default weight of 1.
///
/// # Usage
///
/// ```ignore
/// builder.text_index(TextIndexDecl::new(&["title:10", "body"]).language("english"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextIndexDecl {
    name: Option<String>,
    fields: Vec<String>,
    language: Option<String>,
}

impl TextIndexDecl {
    pub fn new<S: AsRef<str>>(fields: &[S]) -> Self {
        TextIndexDecl {
            fields: fields.iter().map(|f| f.as_ref().to_string()).collect(),
            ..TextIndexDecl::default()
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = if name.is_empty() { None } else { Some(name.to_string()) };
        self
    }

    pub fn language(mut self, language: &str) -> Self {
        self.language = if language.is_empty() { None } else { Some(language.to_string()) };
        self
    }

    pub fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn get_language(&self) -> Option<&str> {
        self.language.as_deref()
    }
}
