use crate::schema::SchemaBuilder;

/// Whether a type is stored on its own or only inside another document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EntityKind {
    /// A top-level record with its own collection
    #[default]
    Entity,
    /// A record that only exists embedded in another one
    Embedded,
}

/// A type with a document layout.
///
/// `describe` is the registration step that stands in for reflection: it
/// declares the storage name, the mapped fields with their accessors, and
/// the indexes. It is normally generated by `#[derive(Entity)]`.
///
/// The mapper creates records with `Default::default()` before binding a
/// document to them.
///
/// # Examples
///
/// ```rust,ignore
/// #[derive(Default)]
/// struct User {
///     id: Option<Uuid>,
///     email: String,
/// }
///
/// impl Entity for User {
///     fn describe(builder: &mut SchemaBuilder<Self>) {
///         builder
///             .name("users")
///             .field(FieldDecl::new("id").id(), |u| &u.id, |u| &mut u.id)
///             .field(
///                 FieldDecl::new("email").indexed(IndexedDecl::new().unique()),
///                 |u| &u.email,
///                 |u| &mut u.email,
///             );
///     }
/// }
/// ```
pub trait Entity: Default + Send + Sync + 'static {
    fn entity_kind() -> EntityKind {
        EntityKind::Entity
    }

    fn describe(builder: &mut SchemaBuilder<Self>);
}
