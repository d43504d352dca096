#[cfg(test)]
#[allow(dead_code, unused)]
mod tests {
    use chrono::{DateTime, Utc};
    use docmap::common::{Shared, SharedList};
    use docmap::doc;
    use docmap::document::Value;
    use docmap::errors::{ErrorKind, MapperResult};
    use docmap::query::{Group, Pipeline, Projection, Query, Update};
    use docmap::store::{Collection, DocumentStore};
    use docmap_derive::{DocEnum, Entity};
    use docmap_int_test::test_util::{run_test, timestamp};

    #[ctor::ctor]
    fn init() {
        colog::init();
    }

    #[derive(DocEnum, Default, Debug, Clone, Copy, PartialEq)]
    pub enum Genre {
        #[default]
        Fiction,
        Science,
    }

    #[derive(Entity, Default, Debug)]
    #[entity(embedded)]
    pub struct Publisher {
        name: String,
        country: String,
    }

    #[derive(Entity, Default, Debug)]
    #[entity(name = "books", index(fields = "author, -published"))]
    pub struct Book {
        #[property(id)]
        id: Option<String>,
        #[property(indexed(unique))]
        isbn: String,
        title: String,
        author: String,
        genre: Genre,
        pages: i32,
        published: DateTime<Utc>,
        tags: SharedList<String>,
        publisher: Option<Shared<Publisher>>,
    }

    fn book(isbn: &str, author: &str, genre: Genre, pages: i32) -> Shared<Book> {
        Shared::new(Book {
            isbn: isbn.to_string(),
            title: format!("Title {}", isbn),
            author: author.to_string(),
            genre,
            pages,
            published: timestamp(2020, 1, 1),
            ..Book::default()
        })
    }

    fn seed(books: &Collection<Book>) -> MapperResult<()> {
        books.save(&book("1", "knuth", Genre::Science, 650))?;
        books.save(&book("2", "knuth", Genre::Science, 350))?;
        books.save(&book("3", "pratchett", Genre::Fiction, 300))?;
        books.save(&book("4", "pratchett", Genre::Fiction, 280))?;
        books.save(&book("5", "le guin", Genre::Fiction, 250))
    }

    #[test]
    fn test_indexes_are_ensured() {
        run_test(|ctx| {
            let books = ctx.collection::<Book>()?;
            assert_eq!(books.name(), "books");
            let indexes = ctx.store().indexes("books");
            assert_eq!(indexes.len(), 2);
            assert_eq!(indexes[0].0, doc! { author: 1, published: (-1) });
            assert_eq!(indexes[1].0, doc! { isbn: 1 });
            assert_eq!(indexes[1].1, doc! { unique: true, name: "isbn_1" });
            Ok(())
        });
    }

    #[test]
    fn test_save_and_load_round_trip() {
        run_test(|ctx| {
            let books = ctx.collection::<Book>()?;
            let record = book("42", "adams", Genre::Fiction, 180);
            record.write().tags.write().push("towel".to_string());
            record.write().publisher = Some(Shared::new(Publisher {
                name: "Pan".to_string(),
                country: "UK".to_string(),
            }));
            books.save(&record)?;

            let id = record.read().id.clone();
            assert!(id.is_some());

            let loaded = books.load(id.unwrap_or_default())?;
            let loaded = loaded.unwrap_or_default();
            let loaded = loaded.read();
            assert_eq!(loaded.title, "Title 42");
            assert_eq!(loaded.genre, Genre::Fiction);
            assert_eq!(loaded.published, timestamp(2020, 1, 1));
            assert_eq!(loaded.tags.read().as_slice(), ["towel"]);
            let publisher = loaded.publisher.clone().unwrap_or_default();
            assert_eq!(publisher.read().country, "UK");
            Ok(())
        });
    }

    #[test]
    fn test_stored_document_layout() {
        run_test(|ctx| {
            let books = ctx.collection::<Book>()?;
            books.save(&book("7", "hopper", Genre::Science, 120))?;

            let query = Query::new().equal("isbn", "7").to_document()?;
            let cursor = ctx.store().find("books", &query)?;
            let stored: Vec<_> = cursor.collect::<Result<_, _>>()?;
            assert_eq!(stored.len(), 1);
            assert_eq!(stored[0].get("genre")?, Value::from("Science"));
            assert_eq!(stored[0].get("author")?, Value::from("hopper"));
            assert!(stored[0].get("_id")?.as_str().is_some());
            Ok(())
        });
    }

    #[test]
    fn test_find_with_operators() {
        run_test(|ctx| {
            let books = ctx.collection::<Book>()?;
            seed(&books)?;

            let query = Query::new()
                .equal("author", "pratchett")
                .greater("pages", 290);
            let found: Vec<String> = books
                .find(&query)?
                .map(|b| {
                    b.map(|b| {
                        let isbn = b.read().isbn.clone();
                        isbn
                    })
                })
                .collect::<Result<_, _>>()?;
            assert_eq!(found, vec!["3"]);

            let query = Query::new().is_in("author", ["le guin", "knuth"]);
            assert_eq!(books.count(&query)?, 3);
            let query = Query::new().filter("pages <", 300)?;
            assert_eq!(books.count(&query)?, 2);
            Ok(())
        });
    }

    #[test]
    fn test_update_and_upsert() {
        run_test(|ctx| {
            let books = ctx.collection::<Book>()?;
            seed(&books)?;

            let outcome = books.update(
                &Query::new().equal("author", "knuth"),
                &Update::new().set("genre", "Fiction").push("tags", "classic"),
                false,
            )?;
            assert_eq!(outcome.matched_count, 2);
            let query = Query::new().equal("genre", "Fiction");
            assert_eq!(books.count(&query)?, 5);

            let outcome = books.update(
                &Query::new().equal("isbn", "99"),
                &Update::new().set("title", "Fresh").set_on_insert("pages", 10),
                true,
            )?;
            assert!(outcome.upserted_id.is_some());
            let fresh = books.find_one(&Query::new().equal("isbn", "99"))?;
            let fresh = fresh.unwrap_or_default();
            assert_eq!(fresh.read().title, "Fresh");
            assert_eq!(fresh.read().pages, 10);
            Ok(())
        });
    }

    #[test]
    fn test_duplicate_key() {
        run_test(|ctx| {
            let books = ctx.collection::<Book>()?;
            books.save(&book("1", "a", Genre::Fiction, 1))?;
            let err = books.save(&book("1", "b", Genre::Fiction, 2)).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::StoreError);
            assert_eq!(books.count(&Query::new())?, 1);
            Ok(())
        });
    }

    #[test]
    fn test_loaded_records_write_through() {
        run_test(|ctx| {
            let books = ctx.collection::<Book>()?;
            seed(&books)?;

            let loaded = books.find_one(&Query::new().equal("isbn", "5"))?;
            let loaded = loaded.unwrap_or_default();
            loaded.write().pages = 999;
            books.save(&loaded)?;

            assert_eq!(books.count(&Query::new().equal("pages", 999))?, 1);
            assert_eq!(books.count(&Query::new())?, 5);
            Ok(())
        });
    }

    #[test]
    fn test_load_and_save_keep_unmapped_keys() {
        run_test(|ctx| {
            let books = ctx.collection::<Book>()?;
            let stored = doc! { _id: "b1", isbn: "legacy-1", title: "Old", shelf: { row: 3 } };
            ctx.store().insert_or_replace("books", &stored)?.into_result()?;

            let loaded = books.load("b1")?.unwrap_or_default();
            loaded.write().title = "New".to_string();
            books.save(&loaded)?;

            let saved = ctx.store().find_one("books", &doc! { _id: "b1" })?.unwrap_or_default();
            assert_eq!(saved.get("title")?, Value::from("New"));
            assert_eq!(saved.dot_get("shelf.row")?, Value::I32(3));
            let keys = saved.keys()?;
            assert_eq!(&keys[..4], ["_id", "isbn", "title", "shelf"]);
            Ok(())
        });
    }

    #[test]
    fn test_remove() {
        run_test(|ctx| {
            let books = ctx.collection::<Book>()?;
            seed(&books)?;
            let victim = books.find_one(&Query::new().equal("isbn", "2"))?;
            let victim = victim.unwrap_or_default();
            assert_eq!(books.remove(&victim)?, 1);
            assert_eq!(books.count(&Query::new())?, 4);
            Ok(())
        });
    }

    #[test]
    fn test_aggregate_group_by_author() {
        run_test(|ctx| {
            let books = ctx.collection::<Book>()?;
            seed(&books)?;

            let group = Group::by_field("author")
                .count("books")
                .sum("pages", "$pages")
                .max("longest", "$pages");
            let pipeline = Pipeline::new()
                .match_query(&Query::new().greater_or_equal("pages", 250))?
                .group(&group)?
                .sort(&["-pages"])?;
            let result = books.aggregate(&pipeline)?;

            let rows: Vec<(Value, Value, Value)> = result
                .iter()
                .map(|d| -> MapperResult<(Value, Value, Value)> {
                    Ok((d.get("_id")?, d.get("books")?, d.get("pages")?))
                })
                .collect::<MapperResult<_>>()?;
            assert_eq!(
                rows,
                vec![
                    (Value::from("knuth"), Value::I32(2), Value::I32(1000)),
                    (Value::from("pratchett"), Value::I32(2), Value::I32(580)),
                    (Value::from("le guin"), Value::I32(1), Value::I32(250)),
                ]
            );
            assert_eq!(result[0].get("longest")?, Value::I32(650));
            Ok(())
        });
    }

    #[test]
    fn test_aggregate_unwind_and_project() {
        run_test(|ctx| {
            let books = ctx.collection::<Book>()?;
            let record = book("8", "liskov", Genre::Science, 200);
            record.write().tags = SharedList::new(vec!["types".to_string(), "abstraction".to_string()]);
            books.save(&record)?;

            let pipeline = Pipeline::new()
                .unwind("tags")?
                .project_with(&Projection::of(&["tags"]).put("_id", 0))?
                .sort(&["tags"])?
                .limit(1)?;
            let result = books.aggregate(&pipeline)?;
            assert_eq!(result.len(), 1);
            assert_eq!(result[0], doc! { tags: "abstraction" });
            Ok(())
        });
    }
}
