//! A document collection that reports its changes.
//!
//! Writes are queued like every other mock operation and applied when the
//! collection is flushed. Each applied write that changes the records hands
//! every snapshot observer a [`QuerySnapshot`] whose changes are computed
//! against the records as they were just before the write.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{Value, json};

use crate::config::MockConfig;
use crate::error::MockError;
use crate::facade::{MockService, OperationFacade};
use crate::firestore::snapshot::{DocumentSnapshot, QuerySnapshot, RecordSet, normalize};
use crate::future::PendingFuture;
use crate::ids::IdGenerator;
use crate::scheduler::Operation;
use crate::time::{Timer, TokioTimer};

type SnapshotObserver = Rc<dyn Fn(&QuerySnapshot)>;

struct Shared {
    path: String,
    records: RefCell<RecordSet>,
    observers: RefCell<Vec<SnapshotObserver>>,
}

impl Shared {
    /// Apply `write` and notify observers if the records changed.
    fn apply(&self, write: impl FnOnce(&mut RecordSet)) {
        #[allow(clippy::disallowed_methods)] // Prior state for the change list
        let prior = self.records.borrow().clone();
        write(&mut self.records.borrow_mut());
        if *self.records.borrow() == prior {
            return;
        }

        let snapshot = QuerySnapshot::new(&self.path, &self.records.borrow(), Some(&prior));
        let observers = self.observers.borrow().clone();
        tracing::debug!(
            path = %self.path,
            changes = snapshot.doc_changes().len(),
            observers = observers.len(),
            "collection changed"
        );
        for observer in observers {
            observer(&snapshot);
        }
    }

    fn snapshot(&self) -> QuerySnapshot {
        QuerySnapshot::new(&self.path, &self.records.borrow(), None)
    }
}

/// Mock of one document collection.
pub struct MockCollection {
    facade: OperationFacade,
    shared: Rc<Shared>,
    ids: IdGenerator,
}

impl MockCollection {
    /// Collection driven by the wall clock.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an empty path.
    pub fn new(path: &str) -> Result<Self, MockError> {
        Self::with_timer(path, Rc::new(TokioTimer))
    }

    /// # Errors
    ///
    /// Returns `InvalidArgument` for an empty path.
    pub fn with_timer(path: &str, timer: Rc<dyn Timer>) -> Result<Self, MockError> {
        Self::with_config(path, &MockConfig::default(), timer)
    }

    /// # Errors
    ///
    /// Returns `InvalidArgument` for an empty path.
    pub fn with_config(
        path: &str,
        config: &MockConfig,
        timer: Rc<dyn Timer>,
    ) -> Result<Self, MockError> {
        let path = path.trim_matches('/');
        if path.is_empty() {
            return Err(MockError::invalid_argument("collection", "path must not be empty"));
        }
        let facade = OperationFacade::new(timer);
        facade.scheduler().auto_flush(config.auto_flush);
        Ok(Self {
            facade,
            shared: Rc::new(Shared {
                path: path.to_string(),
                records: RefCell::new(RecordSet::new()),
                observers: RefCell::new(Vec::new()),
            }),
            ids: config.id_generator(),
        })
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.shared.path
    }

    /// Create or replace the document `id`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a malformed id or non-object data.
    pub fn set(&self, id: &str, data: Value) -> Result<PendingFuture<()>, MockError> {
        validate_id("set", id)?;
        let data = validate_data("set", data)?;
        let id = id.to_string();
        let shared = Rc::clone(&self.shared);
        Ok(self
            .facade
            .defer("set", vec![json!(id), data.clone()], move || {
                shared.apply(|records| {
                    records.insert(id, data);
                });
                Ok(())
            }))
    }

    /// Create a document under a generated id. Resolves with the id.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for non-object data.
    pub fn add(&self, data: Value) -> Result<PendingFuture<String>, MockError> {
        let data = validate_data("add", data)?;
        let id = self.ids.next_id(self.facade.scheduler().now_ms());
        let shared = Rc::clone(&self.shared);
        Ok(self
            .facade
            .defer("add", vec![data.clone()], move || {
                shared.apply(|records| {
                    records.insert(id.clone(), data);
                });
                Ok(id)
            }))
    }

    /// Delete the document `id`. Deleting a missing document succeeds.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a malformed id.
    pub fn delete(&self, id: &str) -> Result<PendingFuture<()>, MockError> {
        validate_id("delete", id)?;
        let id = id.to_string();
        let shared = Rc::clone(&self.shared);
        Ok(self
            .facade
            .defer("delete", vec![json!(id)], move || {
                shared.apply(|records| {
                    records.shift_remove(&id);
                });
                Ok(())
            }))
    }

    /// Snapshot of every document; all of them appear as added.
    ///
    /// An injected result must be an object of id to document data.
    pub fn get(&self) -> PendingFuture<QuerySnapshot> {
        let shared = Rc::clone(&self.shared);
        let path = self.shared.path.clone();
        self.facade.defer_with(
            "get",
            Vec::new(),
            move |value| match value {
                Value::Object(map) => {
                    let records: RecordSet = map.into_iter().collect();
                    Ok(QuerySnapshot::new(&path, &records, None))
                }
                other => Err(MockError::ResultMismatch {
                    operation: "get".to_string(),
                    reason: format!("expected an object of documents, got {other}"),
                }),
            },
            move || Ok(shared.snapshot()),
        )
    }

    /// Read one document.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a malformed id.
    pub fn get_doc(&self, id: &str) -> Result<PendingFuture<DocumentSnapshot>, MockError> {
        validate_id("getDoc", id)?;
        let id = id.to_string();
        let shared = Rc::clone(&self.shared);
        let path = self.shared.path.clone();
        let convert_id = id.clone();
        Ok(self.facade.defer_with(
            "getDoc",
            vec![json!(id)],
            move |value| Ok(DocumentSnapshot::new(&path, &convert_id, Some(value))),
            move || {
                let data = shared.records.borrow().get(&id).cloned();
                Ok(DocumentSnapshot::new(&shared.path, &id, data))
            },
        ))
    }

    /// Observe the collection.
    ///
    /// The observer first receives the current records, all as added, at the
    /// next flush; after that it receives one snapshot per applied write.
    /// Writes queued before the observer are part of its first snapshot.
    pub fn on_snapshot(&self, observer: impl Fn(&QuerySnapshot) + 'static) -> &Self {
        let observer: SnapshotObserver = Rc::new(observer);
        let shared = Rc::clone(&self.shared);
        self.facade
            .scheduler()
            .enqueue(Operation::new("onSnapshot", Vec::new(), move || {
                shared.observers.borrow_mut().push(Rc::clone(&observer));
                observer(&shared.snapshot());
            }));
        self
    }

    /// Current records, bypassing the scheduler.
    #[must_use]
    pub fn records(&self) -> RecordSet {
        self.shared.records.borrow().clone()
    }
}

impl MockService for MockCollection {
    fn facade(&self) -> &OperationFacade {
        &self.facade
    }
}

impl std::fmt::Debug for MockCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockCollection")
            .field("path", &self.shared.path)
            .field("documents", &self.shared.records.borrow().len())
            .field("observers", &self.shared.observers.borrow().len())
            .finish_non_exhaustive()
    }
}

fn validate_id(operation: &str, id: &str) -> Result<(), MockError> {
    if id.is_empty() || id.contains('/') {
        return Err(MockError::invalid_argument(
            operation,
            format!("'{id}' is not a valid document id"),
        ));
    }
    Ok(())
}

fn validate_data(operation: &str, data: Value) -> Result<Value, MockError> {
    match normalize(data) {
        object @ Value::Object(_) => Ok(object),
        other => Err(MockError::invalid_argument(
            operation,
            format!("document data must be an object, got {other}"),
        )),
    }
}
