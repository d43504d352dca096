use chrono::{DateTime, TimeZone, Utc};
use docmap::errors::MapperResult;
use docmap::mapper::Mapper;
use docmap::schema::Entity;
use docmap::store::{Collection, InMemoryStore};
use std::sync::Arc;

/// A fresh mapping context over a fresh in-memory store.
#[derive(Clone)]
pub struct TestContext {
    mapper: Mapper,
    store: InMemoryStore,
}

impl TestContext {
    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    pub fn store(&self) -> &InMemoryStore {
        &self.store
    }

    pub fn collection<T: Entity>(&self) -> MapperResult<Collection<T>> {
        Collection::new(&self.mapper, Arc::new(self.store.clone()))
    }
}

pub fn create_test_context() -> MapperResult<TestContext> {
    create_test_context_with(Mapper::new())
}

pub fn create_test_context_with(mapper: Mapper) -> MapperResult<TestContext> {
    Ok(TestContext {
        mapper,
        store: InMemoryStore::new(),
    })
}

/// Releases every binding the context's mapper holds.
pub fn cleanup(ctx: TestContext) -> MapperResult<()> {
    let live = ctx.mapper.binding_count();
    ctx.mapper.unmap_all()?;
    log::debug!("Released {} live bindings", live);
    Ok(())
}

/// Runs a test body against a fresh context and cleans up afterwards,
/// panicking with the error if either step fails.
pub fn run_test<T>(test: T)
where
    T: FnOnce(&TestContext) -> MapperResult<()>,
{
    let ctx = match create_test_context() {
        Ok(ctx) => ctx,
        Err(e) => panic!("Before run failed: {:?}", e),
    };
    let result = test(&ctx);
    let after = cleanup(ctx);
    if let Err(e) = result {
        panic!("Test failed: {:?}", e);
    }
    if let Err(e) = after {
        panic!("After run failed: {:?}", e);
    }
}

pub fn timestamp(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .unwrap_or_default()
}
