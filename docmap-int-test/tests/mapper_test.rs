#[cfg(test)]
#[allow(dead_code, unused)]
mod tests {
    use docmap::common::{Shared, SharedList};
    use docmap::convert::{GeoPoint, TypeConverter};
    use docmap::doc;
    use docmap::document::Value;
    use docmap::errors::{ErrorKind, MapperError, MapperResult};
    use docmap::mapper::Mapper;
    use docmap_derive::Entity;
    use docmap_int_test::test_util::{cleanup, create_test_context_with};
    use std::thread;

    #[ctor::ctor]
    fn init() {
        colog::init();
    }

    #[derive(Default, Debug, Clone, Copy, PartialEq)]
    pub struct Celsius(f64);

    docmap::scalar_field!(Celsius);

    struct CelsiusConverter;

    impl TypeConverter<Celsius> for CelsiusConverter {
        fn to_value(&self, value: &Celsius) -> MapperResult<Value> {
            Ok(Value::F64(value.0))
        }

        fn from_value(&self, value: &Value) -> MapperResult<Celsius> {
            value.as_number().map(Celsius).ok_or_else(|| {
                MapperError::new("expected a temperature", ErrorKind::ConversionError)
            })
        }
    }

    #[derive(Entity, Default)]
    #[entity(name = "readings")]
    pub struct Reading {
        #[property(id)]
        id: Option<String>,
        temperature: Celsius,
        location: Option<GeoPoint>,
    }

    #[derive(Entity, Default)]
    #[entity(embedded)]
    pub struct Stop {
        name: String,
        minutes: i32,
    }

    #[derive(Entity, Default)]
    #[entity(name = "routes")]
    pub struct Route {
        #[property(id)]
        id: Option<String>,
        stops: SharedList<Shared<Stop>>,
    }

    #[test]
    fn test_unregistered_scalar_fails_schema() {
        let err = Mapper::new().schema::<Reading>().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::SchemaError);

        let err = Mapper::builder().register::<Reading>().build().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::SchemaError);
    }

    #[test]
    fn test_registered_converter() {
        let mapper = Mapper::builder()
            .register_converter::<Celsius, _>(CelsiusConverter)
            .register::<Reading>()
            .build()
            .unwrap();
        let ctx = create_test_context_with(mapper).unwrap();

        let reading = Shared::new(Reading {
            temperature: Celsius(21.5),
            location: Some(GeoPoint::new(51.5, -0.12).unwrap()),
            ..Reading::default()
        });
        let document = ctx.mapper().to_document(&reading).unwrap();
        assert_eq!(document.get("temperature").unwrap(), Value::F64(21.5));
        assert!(document.get("location").unwrap().is_document());

        document.put("temperature", 19).unwrap();
        assert_eq!(reading.read().temperature, Celsius(19.0));

        let readings = ctx.collection::<Reading>().unwrap();
        readings.save(&reading).unwrap();
        let id = reading.read().id.clone().unwrap();
        let loaded = readings.load(id).unwrap().unwrap();
        let location = loaded.read().location.unwrap();
        assert!((location.latitude() - 51.5).abs() < 1e-9);

        cleanup(ctx).unwrap();
    }

    #[test]
    fn test_list_of_embedded_records() {
        let mapper = Mapper::new();
        let route = mapper
            .to_entity::<Route>(&doc! {
                _id: "r1",
                stops: [{ name: "depot", minutes: 0 }, { name: "market", minutes: 12 }]
            })
            .unwrap();
        assert_eq!(route.read().stops.len(), 2);

        let stop = route.read().stops.read()[1].clone();
        assert_eq!(stop.read().name, "market");

        let document = mapper.to_document(&route).unwrap();
        document.dot_put("stops.1.minutes", 15).unwrap();
        assert_eq!(stop.read().minutes, 15);

        let stops = document.get("stops").unwrap();
        let stops = stops.as_list().unwrap();
        stops.push(doc! { name: "harbour", minutes: 30 }).unwrap();
        assert_eq!(route.read().stops.read()[2].read().name, "harbour");
    }

    #[test]
    fn test_identity_across_threads() {
        let mapper = Mapper::new();
        let route = Shared::new(Route::default());
        let documents = thread::scope(|scope| {
            let handles: Vec<_> = (0..4i32)
                .map(|i| {
                    let mapper = mapper.clone();
                    let route = route.clone();
                    scope.spawn(move || {
                        let document = mapper.to_document(&route).unwrap();
                        let stop: Value = doc! { name: (format!("stop {}", i)), minutes: i }.into();
                        document.get("stops").unwrap().as_list().unwrap().push(stop).unwrap();
                        document
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect::<Vec<_>>()
        });

        assert!(documents.iter().all(|d| d.ptr_eq(&documents[0])));
        assert_eq!(route.read().stops.len(), 4);
        assert_eq!(mapper.binding_count(), 1);
    }

    #[test]
    fn test_unmap_all_detaches_views() {
        let mapper = Mapper::new();
        let route = Shared::new(Route {
            id: Some("r2".to_string()),
            ..Route::default()
        });
        let document = mapper.to_document(&route).unwrap();
        mapper.unmap_all().unwrap();

        assert!(!document.is_bound());
        document.put("_id", "changed").unwrap();
        assert_eq!(route.read().id.as_deref(), Some("r2"));
        assert!(!mapper.to_document(&route).unwrap().ptr_eq(&document));
    }
}
