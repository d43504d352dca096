#[cfg(test)]
#[allow(dead_code, unused)]
mod tests {
    use docmap::common::Shared;
    use docmap::doc;
    use docmap::document::{Document, Value};
    use docmap::errors::ErrorKind;
    use docmap::mapper::Mapper;
    use docmap::schema::{EntityKind, PropertyKind};
    use docmap_derive::Entity;

    #[ctor::ctor]
    fn init() {
        colog::init();
    }

    #[derive(Entity, Default, Debug)]
    pub struct Plain {
        count: i32,
        label: String,
    }

    #[derive(Entity, Default)]
    #[entity(name = "books", index(fields = "author, -year", unique))]
    pub struct Book {
        #[property(id)]
        id: Option<String>,
        #[property(name = "t", indexed(descending))]
        title: String,
        author: String,
        year: i32,
        #[property(transient)]
        dirty: bool,
    }

    #[derive(Entity, Default)]
    #[entity(embedded)]
    pub struct Address {
        street: String,
        #[property(indexed(sparse))]
        city: String,
    }

    #[derive(Entity, Default)]
    #[entity(name = "people")]
    pub struct Person {
        #[property(id)]
        id: Option<String>,
        name: String,
        home: Option<Shared<Address>>,
    }

    #[derive(Entity, Default)]
    #[entity(embedded)]
    pub struct Audit {
        #[property(indexed)]
        created_by: String,
        revision: i64,
    }

    #[derive(Entity, Default)]
    #[entity(name = "articles")]
    pub struct Article {
        #[property(id)]
        id: Option<String>,
        headline: String,
        #[property(base)]
        audit: Audit,
    }

    #[derive(Entity, Default)]
    #[entity(text_index(fields = "title:10, body", name = "search", language = "english"))]
    pub struct Post {
        title: String,
        body: String,
    }

    #[derive(Entity, Default)]
    pub struct Loose {
        a: i32,
        #[property(overflow)]
        rest: Document,
    }

    #[derive(Entity, Default)]
    pub struct Clash {
        #[property(name = "x")]
        first: i32,
        #[property(name = "x")]
        second: i32,
    }

    #[test]
    fn test_plain_entity_defaults() {
        let mapper = Mapper::new();
        let schema = mapper.schema::<Plain>().unwrap();
        assert_eq!(schema.storage_name(), "Plain");
        assert_eq!(schema.kind(), EntityKind::Entity);
        assert!(schema.id_property().is_none());
        assert!(schema.indexes().is_empty());

        let names: Vec<&str> = schema.properties().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["count", "label"]);
    }

    #[test]
    fn test_names_ids_and_transient_fields() {
        let mapper = Mapper::new();
        let schema = mapper.schema::<Book>().unwrap();
        assert_eq!(schema.storage_name(), "books");

        let names: Vec<&str> = schema.properties().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["_id", "t", "author", "year"]);
        assert_eq!(schema.id_property().unwrap().field_name(), "id");
        assert_eq!(schema.property("t").unwrap().field_name(), "title");
        assert!(schema.property("dirty").is_none());
    }

    #[test]
    fn test_index_order_and_options() {
        let mapper = Mapper::new();
        let schema = mapper.schema::<Book>().unwrap();
        let indexes = schema.indexes();
        assert_eq!(indexes.len(), 2);

        // type-level indexes come before field-level ones
        assert_eq!(indexes[0].keys_document(), doc! { author: 1, year: (-1) });
        assert_eq!(indexes[0].options_document(), doc! { unique: true, name: "author_1_year_-1" });
        assert_eq!(indexes[1].keys_document(), doc! { t: (-1) });
        assert_eq!(indexes[1].name(), "t_-1");
        assert!(!indexes[1].is_unique());
    }

    #[test]
    fn test_embedded_entity() {
        let mapper = Mapper::new();
        let address = mapper.schema::<Address>().unwrap();
        assert_eq!(address.kind(), EntityKind::Embedded);
        assert_eq!(address.indexes()[0].options_document(), doc! { sparse: true, name: "city_1" });

        let person = mapper.schema::<Person>().unwrap();
        let home = person.property("home").unwrap();
        assert_eq!(home.kind(), PropertyKind::Embedded);
        let nested = home.nested_schema(&mapper).unwrap().unwrap();
        assert_eq!(nested.type_id(), address.type_id());
    }

    #[test]
    fn test_nested_document_is_live() {
        let mapper = Mapper::new();
        let person = mapper
            .to_entity::<Person>(&doc! {
                _id: "p1",
                name: "Grace",
                home: { street: "Main", city: "Arlington" }
            })
            .unwrap();
        let home = person.read().home.clone().unwrap();
        assert_eq!(home.read().city, "Arlington");
        assert_eq!(person.read().id.as_deref(), Some("p1"));

        let document = mapper.to_document(&person).unwrap();
        document.dot_put("home.city", "Boston").unwrap();
        assert_eq!(home.read().city, "Boston");
    }

    #[test]
    fn test_unmapped_nested_keys_keep_their_place() {
        let mapper = Mapper::new();
        let person = mapper
            .to_entity::<Person>(&doc! {
                home: { zip: "22201", city: "Arlington" },
                name: "Grace",
                _id: "p2"
            })
            .unwrap();

        let document = mapper.to_document(&person).unwrap();
        assert_eq!(document.keys().unwrap(), vec!["home", "name", "_id"]);
        assert_eq!(document.dot_get("home.zip").unwrap(), Value::from("22201"));

        let home = document.get("home").unwrap();
        let home = home.as_document().unwrap();
        assert_eq!(home.keys().unwrap(), vec!["zip", "city", "street"]);
    }

    #[test]
    fn test_base_fields_are_flattened() {
        let mapper = Mapper::new();
        let schema = mapper.schema::<Article>().unwrap();
        let names: Vec<&str> = schema.properties().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["_id", "headline", "created_by", "revision"]);
        assert_eq!(schema.indexes()[0].name(), "created_by_1");

        let article = Shared::new(Article::default());
        let document = mapper.to_document(&article).unwrap();
        document.put("created_by", "ada").unwrap();
        document.put("revision", 3i64).unwrap();
        assert_eq!(article.read().audit.created_by, "ada");
        assert_eq!(article.read().audit.revision, 3);
        assert_eq!(document.keys().unwrap(), vec!["_id", "headline", "created_by", "revision"]);
    }

    #[test]
    fn test_text_index() {
        let mapper = Mapper::new();
        let schema = mapper.schema::<Post>().unwrap();
        let index = &schema.indexes()[0];
        assert!(index.is_text());
        assert_eq!(index.keys_document(), doc! { title: "text", body: "text" });
        assert_eq!(
            index.options_document(),
            doc! { name: "search", language: "english", weights: { title: 10 } }
        );
    }

    #[test]
    fn test_overflow_field() {
        let mapper = Mapper::new();
        let schema = mapper.schema::<Loose>().unwrap();
        assert_eq!(schema.overflow_property().unwrap().field_name(), "rest");

        let document = doc! { a: 1, b: "two" };
        let loose = mapper.to_entity::<Loose>(&document).unwrap();
        assert_eq!(loose.read().a, 1);
        assert_eq!(loose.read().rest.get("b").unwrap(), Value::from("two"));
    }

    #[test]
    fn test_duplicate_storage_name_fails() {
        let err = Mapper::new().schema::<Clash>().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::SchemaError);
    }
}
