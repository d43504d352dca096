use std::cmp::Ordering;
use std::sync::Arc;

use dashmap::DashMap;
use itertools::Itertools;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::common::{
    ACC_ADD_TO_SET, ACC_AVG, ACC_FIRST, ACC_LAST, ACC_MAX, ACC_MIN, ACC_PUSH, ACC_SUM, ADD_TO_SET,
    DOC_ID, EACH, FIELD_REFERENCE, INDEX_NAME, INDEX_SPARSE, INDEX_UNIQUE, POP, PULL, PUSH, RENAME,
    SET, SET_ON_INSERT, STAGE_GROUP, STAGE_LIMIT, STAGE_MATCH, STAGE_PROJECT, STAGE_SKIP,
    STAGE_SORT, STAGE_UNWIND, UNSET,
};
use crate::doc;
use crate::document::{Document, DocumentList, Value};
use crate::errors::{ErrorKind, MapperError, MapperResult};
use crate::query::Operator;
use crate::store::{DocumentCursor, DocumentStore, WriteOutcome};

const INC: &str = "$inc";

/// A process-local [`DocumentStore`].
///
/// # Purpose
/// Keeps every collection as an ordered list of free-standing documents.
/// Writes store deep copies and reads hand out deep copies, so a document
/// bound by the mapper never aliases stored data.
///
/// # Characteristics
/// - Store-assigned ids are random UUID strings
/// - Unique indexes are enforced; a violation is reported in the
///   [`WriteOutcome`]
/// - Queries support the comparison, membership, `$exists`, `$size`,
///   `$all` and `$elemMatch` operators
/// - Commands: `count` and `aggregate` (`$match`, `$sort`, `$skip`,
///   `$limit`, `$project`, `$unwind`, `$group`)
///
/// # Usage
/// ```rust
/// use docmap::doc;
/// use docmap::store::{DocumentStore, InMemoryStore};
///
/// let store = InMemoryStore::new();
/// store.insert_or_replace("users", &doc! { _id: 1, name: "Ada" }).unwrap();
/// let found = store.find_one("users", &doc! { name: "Ada" }).unwrap();
/// assert!(found.is_some());
/// ```
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<InMemoryStoreInner>,
}

#[derive(Default)]
struct InMemoryStoreInner {
    collections: DashMap<String, Arc<RwLock<StoredCollection>>>,
}

#[derive(Default)]
struct StoredCollection {
    documents: Vec<Document>,
    indexes: Vec<(Document, Document)>,
}

impl InMemoryStore {
    pub fn new() -> InMemoryStore {
        InMemoryStore::default()
    }

    /// The `(keys, options)` pairs of every index ensured on `collection`.
    pub fn indexes(&self, collection: &str) -> Vec<(Document, Document)> {
        match self.inner.collections.get(collection) {
            Some(stored) => stored.read().indexes.clone(),
            None => Vec::new(),
        }
    }

    /// The names of every collection written to so far.
    pub fn collection_names(&self) -> Vec<String> {
        self.inner
            .collections
            .iter()
            .map(|entry| entry.key().clone())
            .sorted()
            .collect()
    }

    fn collection(&self, name: &str) -> Arc<RwLock<StoredCollection>> {
        self.inner
            .collections
            .entry(name.to_string())
            .or_default()
            .value()
            .clone()
    }

    fn matching(&self, collection: &str, query: &Document) -> MapperResult<Vec<Document>> {
        let stored = self.collection(collection);
        let stored = stored.read();
        let mut found = Vec::new();
        for document in &stored.documents {
            if matches(document, query)? {
                found.push(document.deep_copy()?);
            }
        }
        Ok(found)
    }

    fn count(&self, command: &Document) -> MapperResult<Document> {
        let collection = command_target(command, "count")?;
        let query = match command.get("query")? {
            Value::Document(query) => query,
            _ => Document::new(),
        };
        let n = self.matching(&collection, &query)?.len() as i64;
        Ok(doc! { n: n, ok: 1 })
    }

    fn aggregate(&self, command: &Document) -> MapperResult<Document> {
        let collection = command_target(command, "aggregate")?;
        let stages = match command.get("pipeline")? {
            Value::List(stages) => stages.values()?,
            other => return Err(command_error(&format!("pipeline must be a list, got {}", other))),
        };

        let mut documents = self.matching(&collection, &Document::new())?;
        for stage in stages {
            let stage = match stage {
                Value::Document(stage) => stage,
                other => return Err(command_error(&format!("pipeline stage must be a document, got {}", other))),
            };
            documents = run_stage(documents, &stage)?;
        }
        let result: DocumentList = documents.into_iter().map(Value::Document).collect();
        Ok(doc! { result: result, ok: 1 })
    }
}

impl DocumentStore for InMemoryStore {
    fn find_one(&self, collection: &str, query: &Document) -> MapperResult<Option<Document>> {
        Ok(self.matching(collection, query)?.into_iter().next())
    }

    fn find(&self, collection: &str, query: &Document) -> MapperResult<DocumentCursor> {
        let found = self.matching(collection, query)?;
        Ok(Box::new(found.into_iter().map(Ok)))
    }

    fn insert_or_replace(&self, collection: &str, document: &Document) -> MapperResult<WriteOutcome> {
        let copy = document.deep_copy()?;
        let mut assigned = None;
        if copy.get(DOC_ID)?.is_null() {
            let id = Value::from(Uuid::new_v4().to_string());
            copy.put(DOC_ID, id.clone())?;
            assigned = Some(id);
        }
        let id = copy.get(DOC_ID)?;

        let stored = self.collection(collection);
        let mut stored = stored.write();
        if let Some(error) = stored.unique_violation(&copy)? {
            return Ok(WriteOutcome::failed(&error));
        }
        let position = stored
            .documents
            .iter()
            .map(|existing| existing.get(DOC_ID))
            .collect::<MapperResult<Vec<Value>>>()?
            .into_iter()
            .position(|existing| existing == id);

        match position {
            Some(position) => {
                stored.documents[position] = copy;
                Ok(WriteOutcome::matched(1))
            }
            None => {
                stored.documents.push(copy);
                Ok(match assigned {
                    Some(id) => WriteOutcome::upserted(id),
                    None => WriteOutcome::matched(0),
                })
            }
        }
    }

    fn update(
        &self,
        collection: &str,
        query: &Document,
        update: &Document,
        upsert: bool,
    ) -> MapperResult<WriteOutcome> {
        let stored = self.collection(collection);
        let mut stored = stored.write();

        let mut matched = 0;
        for position in 0..stored.documents.len() {
            if !matches(&stored.documents[position], query)? {
                continue;
            }
            let updated = stored.documents[position].deep_copy()?;
            apply_update(&updated, update, false)?;
            if let Some(error) = stored.unique_violation(&updated)? {
                return Ok(WriteOutcome::failed(&error));
            }
            stored.documents[position] = updated;
            matched += 1;
        }

        if matched > 0 || !upsert {
            return Ok(WriteOutcome::matched(matched));
        }

        let inserted = Document::new();
        for (field, condition) in query.entries()? {
            if !is_operator_document(&condition)? {
                inserted.dot_put(&field, condition.deep_copy()?)?;
            }
        }
        apply_update(&inserted, update, true)?;
        if inserted.get(DOC_ID)?.is_null() {
            inserted.put(DOC_ID, Uuid::new_v4().to_string())?;
        }
        if let Some(error) = stored.unique_violation(&inserted)? {
            return Ok(WriteOutcome::failed(&error));
        }
        let id = inserted.get(DOC_ID)?;
        stored.documents.push(inserted);
        Ok(WriteOutcome::upserted(id))
    }

    fn remove(&self, collection: &str, query: &Document) -> MapperResult<WriteOutcome> {
        let stored = self.collection(collection);
        let mut stored = stored.write();
        let mut kept = Vec::with_capacity(stored.documents.len());
        let mut removed = 0;
        for document in stored.documents.drain(..) {
            if matches(&document, query)? {
                removed += 1;
            } else {
                kept.push(document);
            }
        }
        stored.documents = kept;
        Ok(WriteOutcome::matched(removed))
    }

    fn run_command(&self, command: &Document) -> MapperResult<Document> {
        if command.contains("count")? {
            self.count(command)
        } else if command.contains("aggregate")? {
            self.aggregate(command)
        } else {
            Err(command_error(&format!("unsupported command {}", command)))
        }
    }

    fn ensure_index(&self, collection: &str, keys: &Document, options: &Document) -> MapperResult<()> {
        let stored = self.collection(collection);
        let mut stored = stored.write();
        let name = options.get(INDEX_NAME)?;
        let exists = stored
            .indexes
            .iter()
            .map(|(_, existing)| existing.get(INDEX_NAME))
            .collect::<MapperResult<Vec<Value>>>()?
            .contains(&name);
        if !exists {
            log::debug!("Creating index {} on {}", name, collection);
            stored.indexes.push((keys.deep_copy()?, options.deep_copy()?));
        }
        Ok(())
    }
}

impl StoredCollection {
    /// Describes the first unique index `candidate` would violate.
    fn unique_violation(&self, candidate: &Document) -> MapperResult<Option<String>> {
        let id = candidate.get(DOC_ID)?;
        for (keys, options) in &self.indexes {
            if options.get(INDEX_UNIQUE)?.as_bool() != Some(true) {
                continue;
            }
            let fields = keys.keys()?;
            let key = index_key(candidate, &fields)?;
            if options.get(INDEX_SPARSE)?.as_bool() == Some(true) && key.iter().all(Value::is_null) {
                continue;
            }
            for existing in &self.documents {
                if existing.get(DOC_ID)? != id && index_key(existing, &fields)? == key {
                    return Ok(Some(format!(
                        "duplicate key error on index {}",
                        options.get(INDEX_NAME)?
                    )));
                }
            }
        }
        Ok(None)
    }
}

fn index_key(document: &Document, fields: &[String]) -> MapperResult<Vec<Value>> {
    fields.iter().map(|field| document.dot_get(field)).collect()
}

fn command_target(command: &Document, name: &str) -> MapperResult<String> {
    match command.get(name)? {
        Value::String(collection) => Ok(collection),
        other => Err(command_error(&format!("{} needs a collection name, got {}", name, other))),
    }
}

fn command_error(message: &str) -> MapperError {
    log::error!("{}", message);
    MapperError::new(message, ErrorKind::StoreError)
}

fn unsupported(operator: &str) -> MapperError {
    log::error!("Operator {} is not supported by the in-memory store", operator);
    MapperError::new(
        &format!("Operator {} is not supported by the in-memory store", operator),
        ErrorKind::UnknownOperator,
    )
}

fn is_operator_document(value: &Value) -> MapperResult<bool> {
    match value {
        Value::Document(document) => {
            let keys = document.keys()?;
            Ok(!keys.is_empty() && keys.iter().all(|k| k.starts_with(FIELD_REFERENCE)))
        }
        _ => Ok(false),
    }
}

/// Evaluates a query document against `document`.
fn matches(document: &Document, query: &Document) -> MapperResult<bool> {
    for (field, condition) in query.entries()? {
        let value = document.dot_get(&field)?;
        let satisfied = if is_operator_document(&condition)? {
            let mut all = true;
            let present = document.dot_contains(&field)?;
            if let Value::Document(operators) = &condition {
                for (symbol, argument) in operators.entries()? {
                    if !evaluate_operator(&symbol, &value, present, &argument)? {
                        all = false;
                        break;
                    }
                }
            }
            all
        } else {
            equals(&value, &condition)?
        };
        if !satisfied {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Equality, where a list field matches if any of its elements does.
fn equals(value: &Value, expected: &Value) -> MapperResult<bool> {
    if value == expected {
        return Ok(true);
    }
    match value {
        Value::List(list) => Ok(list.values()?.contains(expected)),
        _ => Ok(false),
    }
}

fn evaluate_operator(symbol: &str, value: &Value, present: bool, argument: &Value) -> MapperResult<bool> {
    let operator = Operator::from_symbol(symbol).ok_or_else(|| unsupported(symbol))?;
    let ordered = |accept: fn(Ordering) -> bool| compare(value, argument).map(accept).unwrap_or(false);
    Ok(match operator {
        Operator::Equal => equals(value, argument)?,
        Operator::NotEqual => !equals(value, argument)?,
        Operator::GreaterThan => ordered(|o| o == Ordering::Greater),
        Operator::GreaterThanOrEqual => ordered(|o| o != Ordering::Less),
        Operator::LessThan => ordered(|o| o == Ordering::Less),
        Operator::LessThanOrEqual => ordered(|o| o != Ordering::Greater),
        Operator::Exists => present == argument.as_bool().unwrap_or(true),
        Operator::In => {
            let mut found = false;
            for candidate in list_argument(symbol, argument)? {
                if equals(value, &candidate)? {
                    found = true;
                    break;
                }
            }
            found
        }
        Operator::NotIn => {
            let mut found = false;
            for candidate in list_argument(symbol, argument)? {
                if equals(value, &candidate)? {
                    found = true;
                    break;
                }
            }
            !found
        }
        Operator::All => match value {
            Value::List(list) => {
                let values = list.values()?;
                list_argument(symbol, argument)?
                    .iter()
                    .all(|required| values.contains(required))
            }
            _ => false,
        },
        Operator::Size => match (value, argument.as_integer()) {
            (Value::List(list), Some(size)) => list.len()? as i64 == size,
            _ => false,
        },
        Operator::ElementMatch => match (value, argument) {
            (Value::List(list), Value::Document(condition)) => {
                let mut found = false;
                for element in list.values()? {
                    if let Value::Document(element) = element {
                        if matches(&element, condition)? {
                            found = true;
                            break;
                        }
                    }
                }
                found
            }
            _ => false,
        },
        _ => return Err(unsupported(symbol)),
    })
}

fn list_argument(symbol: &str, argument: &Value) -> MapperResult<Vec<Value>> {
    match argument {
        Value::List(list) => list.values(),
        other => {
            log::error!("Operator {} needs a list, got {}", symbol, other);
            Err(MapperError::new(
                &format!("Operator {} needs a list, got {}", symbol, other),
                ErrorKind::ValidationError,
            ))
        }
    }
}

/// Orders two values of comparable kinds.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (a.as_integer(), b.as_integer()) {
        return Some(x.cmp(&y));
    }
    if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::DateTime(x), Value::DateTime(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Null, _) => Some(Ordering::Less),
        (_, Value::Null) => Some(Ordering::Greater),
        _ => None,
    }
}

/// Applies an update document in place. A document without operator keys
/// replaces every field but `_id`.
fn apply_update(document: &Document, update: &Document, inserting: bool) -> MapperResult<()> {
    let entries = update.entries()?;
    if entries.iter().all(|(key, _)| !key.starts_with(FIELD_REFERENCE)) {
        for key in document.keys()? {
            if key != DOC_ID {
                document.remove(&key)?;
            }
        }
        for (key, value) in entries {
            document.put(key, value.deep_copy()?)?;
        }
        return Ok(());
    }

    for (operator, fields) in entries {
        let fields = match fields {
            Value::Document(fields) => fields,
            other => {
                log::error!("Update operator {} needs a document, got {}", operator, other);
                return Err(MapperError::new(
                    &format!("Update operator {} needs a document, got {}", operator, other),
                    ErrorKind::ValidationError,
                ));
            }
        };
        for (field, argument) in fields.entries()? {
            match operator.as_str() {
                SET => document.dot_put(&field, argument.deep_copy()?)?,
                SET_ON_INSERT if inserting => document.dot_put(&field, argument.deep_copy()?)?,
                SET_ON_INSERT => {}
                UNSET => {
                    document.dot_remove(&field)?;
                }
                INC => {
                    let current = document.dot_get(&field)?;
                    document.dot_put(&field, add(&current, &argument))?;
                }
                PUSH | ADD_TO_SET => {
                    let list = list_at(document, &field)?;
                    for value in each(&argument)? {
                        if operator == ADD_TO_SET && list.values()?.contains(&value) {
                            continue;
                        }
                        list.push(value.deep_copy()?)?;
                    }
                }
                PULL => {
                    if let Value::List(list) = document.dot_get(&field)? {
                        let pulled = each(&argument)?;
                        let kept: DocumentList = list
                            .values()?
                            .into_iter()
                            .filter(|value| !pulled.contains(value))
                            .collect();
                        document.dot_put(&field, kept)?;
                    }
                }
                POP => {
                    if let Value::List(list) = document.dot_get(&field)? {
                        let len = list.len()?;
                        if len > 0 {
                            let index = if argument.as_integer() == Some(-1) { 0 } else { len - 1 };
                            list.remove_at(index)?;
                        }
                    }
                }
                RENAME => {
                    if let (Some(value), Some(target)) = (document.dot_remove(&field)?, argument.as_str()) {
                        document.dot_put(target, value)?;
                    }
                }
                other => return Err(unsupported(other)),
            }
        }
    }
    Ok(())
}

fn each(argument: &Value) -> MapperResult<Vec<Value>> {
    if let Value::Document(batch) = argument {
        if let Value::List(values) = batch.get(EACH)? {
            return values.values();
        }
    }
    Ok(vec![argument.clone()])
}

fn list_at(document: &Document, field: &str) -> MapperResult<DocumentList> {
    match document.dot_get(field)? {
        Value::List(list) => Ok(list),
        _ => {
            document.dot_put(field, DocumentList::new())?;
            match document.dot_get(field)? {
                Value::List(list) => Ok(list),
                other => Err(MapperError::new(
                    &format!("Field {} holds a {}, not a list", field, other.kind_name()),
                    ErrorKind::InternalError,
                )),
            }
        }
    }
}

fn add(a: &Value, b: &Value) -> Value {
    if let (Some(x), Some(y)) = (a.as_integer(), b.as_integer()) {
        return Value::I64(x + y);
    }
    match (a.as_number(), b.as_number()) {
        (Some(x), Some(y)) => Value::F64(x + y),
        (None, Some(_)) => b.clone(),
        _ => a.clone(),
    }
}

fn run_stage(documents: Vec<Document>, stage: &Document) -> MapperResult<Vec<Document>> {
    let (name, argument) = match stage.entries()?.into_iter().next() {
        Some(entry) => entry,
        None => return Err(command_error("empty pipeline stage")),
    };

    match (name.as_str(), argument) {
        (STAGE_MATCH, Value::Document(query)) => {
            let mut kept = Vec::new();
            for document in documents {
                if matches(&document, &query)? {
                    kept.push(document);
                }
            }
            Ok(kept)
        }
        (STAGE_SORT, Value::Document(keys)) => sort(documents, &keys),
        (STAGE_SKIP, skip) => {
            let skip = skip.as_integer().unwrap_or(0).max(0) as usize;
            Ok(documents.into_iter().skip(skip).collect())
        }
        (STAGE_LIMIT, limit) => {
            let limit = limit.as_integer().unwrap_or(0).max(0) as usize;
            Ok(documents.into_iter().take(limit).collect())
        }
        (STAGE_PROJECT, Value::Document(projection)) => documents
            .iter()
            .map(|document| project(document, &projection))
            .collect(),
        (STAGE_UNWIND, Value::String(reference)) => unwind(documents, &reference),
        (STAGE_GROUP, Value::Document(group)) => group_by(documents, &group),
        (name, argument) => Err(command_error(&format!(
            "unsupported pipeline stage {} with argument {}",
            name, argument
        ))),
    }
}

fn sort(documents: Vec<Document>, keys: &Document) -> MapperResult<Vec<Document>> {
    let keys: Vec<(String, bool)> = keys
        .entries()?
        .into_iter()
        .map(|(field, direction)| (field, direction.as_integer().unwrap_or(1) < 0))
        .collect();

    let mut rows = Vec::with_capacity(documents.len());
    for document in documents {
        let values = keys
            .iter()
            .map(|(field, _)| document.dot_get(field))
            .collect::<MapperResult<Vec<Value>>>()?;
        rows.push((values, document));
    }
    rows.sort_by(|(a, _), (b, _)| {
        for (index, (_, descending)) in keys.iter().enumerate() {
            let order = compare(&a[index], &b[index]).unwrap_or(Ordering::Equal);
            let order = if *descending { order.reverse() } else { order };
            if order != Ordering::Equal {
                return order;
            }
        }
        Ordering::Equal
    });
    Ok(rows.into_iter().map(|(_, document)| document).collect())
}

fn project(document: &Document, projection: &Document) -> MapperResult<Document> {
    let entries = projection.entries()?;
    let excluded = |value: &Value| match value {
        Value::Bool(flag) => !flag,
        other => other.as_integer().map(|n| n <= 0).unwrap_or(false),
    };

    let inclusive = entries.iter().any(|(_, value)| !excluded(value));
    if !inclusive {
        let projected = document.deep_copy()?;
        for (field, _) in &entries {
            projected.dot_remove(field)?;
        }
        return Ok(projected);
    }

    let projected = Document::new();
    let keeps_id = !entries
        .iter()
        .any(|(field, value)| field == DOC_ID && excluded(value));
    if keeps_id && document.contains(DOC_ID)? {
        projected.put(DOC_ID, document.get(DOC_ID)?)?;
    }
    for (field, value) in entries {
        if excluded(&value) {
            continue;
        }
        match value {
            Value::Bool(_) | Value::I32(_) | Value::I64(_) => {
                if document.dot_contains(&field)? {
                    projected.dot_put(&field, document.dot_get(&field)?)?;
                }
            }
            expression => projected.dot_put(&field, evaluate(document, &expression)?)?,
        }
    }
    Ok(projected)
}

fn unwind(documents: Vec<Document>, reference: &str) -> MapperResult<Vec<Document>> {
    let field = reference.strip_prefix(FIELD_REFERENCE).unwrap_or(reference);
    let mut unwound = Vec::new();
    for document in documents {
        if let Value::List(list) = document.dot_get(field)? {
            for element in list.values()? {
                let copy = document.deep_copy()?;
                copy.dot_put(field, element)?;
                unwound.push(copy);
            }
        }
    }
    Ok(unwound)
}

/// Evaluates a `$field` reference or a document of expressions.
fn evaluate(document: &Document, expression: &Value) -> MapperResult<Value> {
    match expression {
        Value::String(reference) if reference.starts_with(FIELD_REFERENCE) => {
            document.dot_get(&reference[FIELD_REFERENCE.len()..])
        }
        Value::Document(expressions) => {
            let evaluated = Document::new();
            for (key, value) in expressions.entries()? {
                evaluated.put(key, evaluate(document, &value)?)?;
            }
            Ok(Value::Document(evaluated))
        }
        other => other.deep_copy(),
    }
}

fn group_by(documents: Vec<Document>, group: &Document) -> MapperResult<Vec<Document>> {
    let id_expression = group.get(DOC_ID)?;
    let accumulators: Vec<(String, String, Value)> = group
        .entries()?
        .into_iter()
        .filter(|(name, _)| name != DOC_ID)
        .map(|(name, expression)| match expression {
            Value::Document(expression) => match expression.entries()?.into_iter().next() {
                Some((accumulator, argument)) => Ok((name, accumulator, argument)),
                None => Err(command_error(&format!("empty accumulator for {}", name))),
            },
            other => Err(command_error(&format!("accumulator for {} must be a document, got {}", name, other))),
        })
        .collect::<MapperResult<_>>()?;

    let mut groups: Vec<(Value, Vec<Document>)> = Vec::new();
    for document in documents {
        let id = evaluate(&document, &id_expression)?;
        match groups.iter_mut().find(|(key, _)| *key == id) {
            Some((_, members)) => members.push(document),
            None => groups.push((id, vec![document])),
        }
    }

    let mut result = Vec::with_capacity(groups.len());
    for (id, members) in groups {
        let output = Document::new();
        output.put(DOC_ID, id)?;
        for (name, accumulator, argument) in &accumulators {
            let values = members
                .iter()
                .map(|member| evaluate(member, argument))
                .collect::<MapperResult<Vec<Value>>>()?;
            output.put(name.as_str(), accumulate(accumulator, values)?)?;
        }
        result.push(output);
    }
    Ok(result)
}

fn accumulate(accumulator: &str, values: Vec<Value>) -> MapperResult<Value> {
    let numbers = || values.iter().filter(|v| v.is_number());
    Ok(match accumulator {
        ACC_SUM => numbers().fold(Value::I32(0), |total, v| add(&total, v)),
        ACC_AVG => {
            let count = numbers().count();
            if count == 0 {
                Value::Null
            } else {
                let total: f64 = numbers().filter_map(Value::as_number).sum();
                Value::F64(total / count as f64)
            }
        }
        ACC_MIN => values
            .iter()
            .filter(|v| !v.is_null())
            .min_by(|a, b| compare(a, b).unwrap_or(Ordering::Equal))
            .cloned()
            .unwrap_or(Value::Null),
        ACC_MAX => values
            .iter()
            .filter(|v| !v.is_null())
            .max_by(|a, b| compare(a, b).unwrap_or(Ordering::Equal))
            .cloned()
            .unwrap_or(Value::Null),
        ACC_FIRST => values.first().cloned().unwrap_or(Value::Null),
        ACC_LAST => values.last().cloned().unwrap_or(Value::Null),
        ACC_PUSH => Value::List(values.into_iter().collect()),
        ACC_ADD_TO_SET => {
            let mut distinct: Vec<Value> = Vec::new();
            for value in values {
                if !distinct.contains(&value) {
                    distinct.push(value);
                }
            }
            Value::List(distinct.into_iter().collect())
        }
        other => return Err(unsupported(other)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Group, Pipeline, Query, Update};

    fn people() -> InMemoryStore {
        let store = InMemoryStore::new();
        for (id, name, age, city, tags) in [
            (1, "Ada", 36, "London", vec!["math", "code"]),
            (2, "Alan", 41, "London", vec!["code"]),
            (3, "Grace", 85, "Arlington", vec!["navy", "code"]),
        ] {
            let tags: DocumentList = tags.into_iter().collect();
            store
                .insert_or_replace(
                    "people",
                    &doc! { _id: id, name: name, age: age, city: city, tags: tags },
                )
                .unwrap();
        }
        store
    }

    fn find(store: &InMemoryStore, query: Query) -> Vec<Document> {
        store
            .find("people", &query.to_document().unwrap())
            .unwrap()
            .map(Result::unwrap)
            .collect()
    }

    #[test]
    fn test_query_operators() {
        let store = people();
        assert_eq!(find(&store, Query::new().greater("age", 40)).len(), 2);
        assert_eq!(find(&store, Query::new().less_or_equal("age", 36)).len(), 1);
        assert_eq!(find(&store, Query::new().equal("tags", "navy")).len(), 1);
        assert_eq!(find(&store, Query::new().is_in("city", ["Paris", "London"])).len(), 2);
        assert_eq!(find(&store, Query::new().not_in("city", ["London"])).len(), 1);
        assert_eq!(find(&store, Query::new().all("tags", ["code", "math"])).len(), 1);
        assert_eq!(find(&store, Query::new().size("tags", 2)).len(), 2);
        assert_eq!(find(&store, Query::new().exists("city")).len(), 3);
        assert_eq!(find(&store, Query::new().not_exists("email")).len(), 3);
        assert_eq!(find(&store, Query::new().not_equal("name", "Ada")).len(), 2);
    }

    #[test]
    fn test_unsupported_operator() {
        let store = people();
        let query = Query::new().filter_op("loc", Operator::Near, doc! { x: 1 });
        let err = store.find("people", &query.to_document().unwrap()).err().unwrap();
        assert_eq!(err.kind(), &ErrorKind::UnknownOperator);
    }

    #[test]
    fn test_reads_are_copies() {
        let store = people();
        let found = store.find_one("people", &doc! { _id: 1 }).unwrap().unwrap();
        found.put("name", "changed").unwrap();
        let again = store.find_one("people", &doc! { _id: 1 }).unwrap().unwrap();
        assert_eq!(again.get("name").unwrap(), Value::from("Ada"));
    }

    #[test]
    fn test_assigned_id() {
        let store = InMemoryStore::new();
        let outcome = store.insert_or_replace("c", &doc! { a: 1 }).unwrap();
        let id = outcome.upserted_id.unwrap();
        assert!(id.as_str().is_some());
        assert!(store.find_one("c", &doc! { _id: id }).unwrap().is_some());
    }

    #[test]
    fn test_update_operators() {
        let store = people();
        let update = Update::new()
            .set("city", "Paris")
            .push("tags", "chess")
            .add_to_set("tags", "code")
            .put_in("$inc", "age", 1)
            .unset(&["name"]);
        let outcome = store
            .update("people", &doc! { _id: 1 }, &update.to_document().unwrap(), false)
            .unwrap();
        assert_eq!(outcome.matched_count, 1);

        let ada = store.find_one("people", &doc! { _id: 1 }).unwrap().unwrap();
        assert_eq!(
            ada,
            doc! { _id: 1, age: 37i64, city: "Paris", tags: ["math", "code", "chess"] }
        );
    }

    #[test]
    fn test_pull_pop_rename() {
        let store = people();
        let update = Update::new().pull("tags", "code").rename("city", "town");
        store
            .update("people", &doc! { _id: 3 }, &update.to_document().unwrap(), false)
            .unwrap();
        let update = Update::new().pop_first("tags");
        store
            .update("people", &doc! { _id: 1 }, &update.to_document().unwrap(), false)
            .unwrap();

        let grace = store.find_one("people", &doc! { _id: 3 }).unwrap().unwrap();
        assert_eq!(grace.get("tags").unwrap(), Value::from(vec![Value::from("navy")]));
        assert_eq!(grace.get("town").unwrap(), Value::from("Arlington"));
        let ada = store.find_one("people", &doc! { _id: 1 }).unwrap().unwrap();
        assert_eq!(ada.get("tags").unwrap(), Value::from(vec![Value::from("code")]));
    }

    #[test]
    fn test_upsert() {
        let store = InMemoryStore::new();
        let update = Update::new().set("hits", 1).set_on_insert("created", true);
        let outcome = store
            .update("pages", &doc! { path: "/" }, &update.to_document().unwrap(), true)
            .unwrap();
        assert!(outcome.upserted_id.is_some());

        let outcome = store
            .update("pages", &doc! { path: "/" }, &update.to_document().unwrap(), true)
            .unwrap();
        assert_eq!(outcome, WriteOutcome::matched(1));
        let page = store.find_one("pages", &doc! {}).unwrap().unwrap();
        assert_eq!(page.get("path").unwrap(), Value::from("/"));
        assert_eq!(page.get("created").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_unique_index() {
        let store = people();
        store
            .ensure_index("people", &doc! { name: 1 }, &doc! { unique: true, name: "name_1" })
            .unwrap();
        store
            .ensure_index("people", &doc! { name: 1 }, &doc! { unique: true, name: "name_1" })
            .unwrap();
        assert_eq!(store.indexes("people").len(), 1);

        let outcome = store
            .insert_or_replace("people", &doc! { _id: 9, name: "Ada" })
            .unwrap();
        assert!(outcome.error.is_some());
        // replacing a document with its own key is fine
        let outcome = store
            .insert_or_replace("people", &doc! { _id: 1, name: "Ada" })
            .unwrap();
        assert_eq!(outcome, WriteOutcome::matched(1));
    }

    #[test]
    fn test_remove() {
        let store = people();
        let outcome = store.remove("people", &doc! { city: "London" }).unwrap();
        assert_eq!(outcome.matched_count, 2);
        assert_eq!(find(&store, Query::new()).len(), 1);
    }

    #[test]
    fn test_count_command() {
        let store = people();
        let response = store
            .run_command(&doc! { count: "people", query: { city: "London" } })
            .unwrap();
        assert_eq!(response.get("n").unwrap(), Value::I64(2));
        assert!(store.run_command(&doc! { drop: "people" }).is_err());
    }

    #[test]
    fn test_aggregate_command() {
        let store = people();
        let pipeline = Pipeline::new()
            .unwind("tags")
            .unwrap()
            .group(
                &Group::by_field("tags")
                    .count("people")
                    .push("names", "$name")
                    .avg("age", "$age"),
            )
            .unwrap()
            .sort(&["-people", "_id"])
            .unwrap()
            .limit(2)
            .unwrap();
        let response = store
            .run_command(&doc! { aggregate: "people", pipeline: (pipeline.to_list()) })
            .unwrap();
        let result: Vec<Document> = response
            .get("result")
            .unwrap()
            .as_list()
            .unwrap()
            .values()
            .unwrap()
            .into_iter()
            .filter_map(|v| v.as_document().cloned())
            .collect();
        assert_eq!(result.len(), 2);
        assert_eq!(
            result[0],
            doc! {
                _id: "code",
                people: 3i64,
                names: ["Ada", "Alan", "Grace"],
                age: (54.0),
            }
        );
        assert_eq!(result[1].get("_id").unwrap(), Value::from("math"));
    }

    #[test]
    fn test_project_and_skip() {
        let store = people();
        let pipeline = Pipeline::new()
            .sort(&["age"])
            .unwrap()
            .skip(1)
            .unwrap()
            .project(&["name", "-_id"])
            .unwrap();
        let response = store
            .run_command(&doc! { aggregate: "people", pipeline: (pipeline.to_list()) })
            .unwrap();
        let result = response.get("result").unwrap();
        assert_eq!(
            result,
            Value::from(vec![
                Value::Document(doc! { name: "Alan" }),
                Value::Document(doc! { name: "Grace" }),
            ])
        );
    }
}
