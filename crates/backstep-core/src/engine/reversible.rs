//! The reversible engine.
//!
//! A run executes a migration body inside a store savepoint. Every mutating
//! batch records its undo information in a [`RollbackLog`]; if the body or
//! the post-run integrity checks fail, the log is undone newest first and the
//! savepoint is rolled back, leaving the dataset as it was before the run.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::config::EngineConfig;
use super::error::{EngineError, RollbackFailure};
use super::integrity::{verify_relation, IntegrityCheck};
use super::progress::ProgressSink;
use super::retry::RetryPolicy;
use super::rollback::{PriorAttributes, RelatedSnapshot, RollbackLog, RollbackPayload};
use super::state::{EngineState, ExecutionLogEntry, ExecutionStatus};
use crate::error::Error;
use crate::load::{BatchPacer, FixedPacer};
use crate::relation::RelationDef;
use crate::selector::Selector;
use crate::sleep::{Sleeper, ThreadSleeper};
use crate::storage::{Savepoint, Store};
use crate::value::{Attributes, RecordId};

/// Page size used when collecting related rows.
const RELATED_PAGE: usize = 1000;

/// Executes migration bodies so that a failure leaves no trace.
pub struct ReversibleEngine<S: Store> {
    store: Arc<S>,
    config: EngineConfig,
    relations: Vec<RelationDef>,
    checks: Vec<IntegrityCheck>,
    pacer: Box<dyn BatchPacer>,
    sleeper: Arc<dyn Sleeper>,
    progress: Option<Arc<dyn ProgressSink>>,
    log: RollbackLog,
    state: EngineState,
    processed: u64,
    execution: Option<ExecutionLogEntry>,
}

impl<S: Store> ReversibleEngine<S> {
    /// Create an engine over `store` with a fixed-size pacer.
    pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
        Self {
            store,
            config,
            relations: Vec::new(),
            checks: Vec::new(),
            pacer: Box::new(FixedPacer),
            sleeper: Arc::new(ThreadSleeper),
            progress: None,
            log: RollbackLog::new(),
            state: EngineState::Idle,
            processed: 0,
            execution: None,
        }
    }

    /// Declare a relation, used for integrity checks and related deletes.
    pub fn with_relation(mut self, relation: RelationDef) -> Self {
        self.relations.push(relation);
        self
    }

    /// Register an integrity check run after every successful body.
    pub fn with_check(mut self, check: IntegrityCheck) -> Self {
        self.checks.push(check);
        self
    }

    /// Replace the batch pacer.
    pub fn with_pacer(mut self, pacer: impl BatchPacer + 'static) -> Self {
        self.pacer = Box::new(pacer);
        self
    }

    /// Pause between retry attempts through `sleeper`.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Report progress to `sink`.
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Replace or clear the progress sink.
    pub fn set_progress(&mut self, sink: Option<Arc<dyn ProgressSink>>) {
        self.progress = sink;
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn relations(&self) -> &[RelationDef] {
        &self.relations
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Undo information recorded so far.
    pub fn rollback_log(&self) -> &RollbackLog {
        &self.log
    }

    /// Rows processed by mutation primitives since the current run began.
    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// Record of the last finished run.
    pub fn last_execution(&self) -> Option<&ExecutionLogEntry> {
        self.execution.as_ref()
    }

    /// Take the record of the last finished run, clearing it.
    pub fn take_execution(&mut self) -> Option<ExecutionLogEntry> {
        self.execution.take()
    }

    /// Run `body` as a single reversible unit.
    ///
    /// On success the body's writes are kept and the rollback log is
    /// cleared. On failure every recorded batch is undone, the savepoint is
    /// rolled back and the body's error is returned, or
    /// [`EngineError::RollbackFailed`] when undoing failed as well.
    pub fn run<T, F>(&mut self, body: F) -> Result<T, EngineError>
    where
        F: FnOnce(&mut Self) -> Result<T, EngineError>,
    {
        if !self.state.can_start() {
            return Err(EngineError::AlreadyRunning);
        }

        let savepoint = self.store.savepoint()?;
        let started_at = Utc::now();
        let timer = Instant::now();
        self.log.clear();
        self.processed = 0;
        self.state = EngineState::Running;

        info!(
            migration = %self.config.migration_name,
            savepoint = savepoint.depth(),
            "Starting migration run"
        );

        let outcome = body(self).and_then(|value| {
            if self.config.verify_on_success {
                self.state = EngineState::Verifying;
                self.verify_integrity(&[])?;
            }
            Ok(value)
        });

        let outcome = match outcome {
            Ok(value) => self
                .store
                .release_savepoint(savepoint)
                .map(|_| value)
                .map_err(EngineError::from),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(value) => {
                let entries = self.log.len();
                self.log.clear();
                self.state = EngineState::Succeeded;
                self.finish(ExecutionStatus::Success, started_at, timer.elapsed(), entries, None);
                info!(
                    migration = %self.config.migration_name,
                    processed = self.processed,
                    rollback_entries = entries,
                    elapsed_ms = timer.elapsed().as_millis() as u64,
                    "Migration run succeeded"
                );
                Ok(value)
            }
            Err(err) => {
                let entries = self.log.len();
                let err = self.fail(savepoint, err);
                let status = match &err {
                    EngineError::RollbackFailed { .. } => ExecutionStatus::RollbackFailed,
                    _ => ExecutionStatus::Failed,
                };
                self.finish(status, started_at, timer.elapsed(), entries, Some(&err));
                Err(err)
            }
        }
    }

    /// Undo a failed run and roll back its savepoint.
    fn fail(&mut self, savepoint: Savepoint, err: EngineError) -> EngineError {
        self.state = EngineState::RollbackInProgress;
        warn!(
            migration = %self.config.migration_name,
            error = %err,
            entries = self.log.len(),
            "Migration run failed, rolling back"
        );

        let undone = self.undo();
        let restored = self.store.rollback_to_savepoint(savepoint);
        self.state = EngineState::Failed;

        let failure = match (undone, restored) {
            (Ok(()), Ok(())) => return err,
            (Err(failure), restored) => {
                if let Err(e) = restored {
                    error!(error = %e, "Savepoint rollback failed after undo failure");
                }
                failure
            }
            (Ok(()), Err(e)) => RollbackFailure {
                sequence: None,
                operation: "savepoint",
                error: Box::new(e.into()),
            },
        };

        error!(
            migration = %self.config.migration_name,
            error = %err,
            rollback = %failure,
            "Rollback failed, manual intervention required"
        );
        EngineError::RollbackFailed {
            source: Box::new(err),
            rollback: failure,
        }
    }

    fn finish(
        &mut self,
        status: ExecutionStatus,
        started_at: chrono::DateTime<Utc>,
        duration: Duration,
        rollback_entries: usize,
        err: Option<&EngineError>,
    ) {
        self.execution = Some(ExecutionLogEntry {
            migration: self.config.migration_name.clone(),
            status,
            started_at,
            duration,
            rollback_entries,
            error_class: err.map(|e| e.class().to_string()),
            error_message: err.map(|e| e.to_string()),
        });
    }

    /// Insert `records` in batches and return their identifiers in order.
    ///
    /// `on_batch` is called with the identifiers of each inserted batch.
    pub fn create(
        &mut self,
        entity_type: &str,
        records: Vec<Attributes>,
        batch_size: usize,
        mut on_batch: Option<&mut dyn FnMut(&[RecordId])>,
    ) -> Result<Vec<RecordId>, EngineError> {
        if batch_size == 0 {
            return Err(EngineError::InvalidBatchSize);
        }

        let mut all_ids = Vec::with_capacity(records.len());
        let mut remaining = records.into_iter().peekable();
        while remaining.peek().is_some() {
            let size = self.pacer.batch_size(batch_size).max(1);
            let timer = Instant::now();
            let mut ids = Vec::with_capacity(size);
            let mut failure = None;
            for attributes in remaining.by_ref().take(size) {
                match self.store.insert(entity_type, &attributes) {
                    Ok(id) => ids.push(id),
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                }
            }

            if !ids.is_empty() {
                self.log.append(RollbackPayload::Created {
                    entity_type: entity_type.to_string(),
                    ids: ids.clone(),
                });
            }
            if let Some(e) = failure {
                return Err(e.into());
            }

            if let Some(callback) = on_batch.as_mut() {
                callback(&ids);
            }
            let rows = ids.len();
            all_ids.extend(ids);
            self.after_batch("create", entity_type, rows, timer.elapsed());
        }
        Ok(all_ids)
    }

    /// Set `changes` on every record matching `selector`, in batches.
    ///
    /// Returns the number of records updated.
    pub fn update(
        &mut self,
        entity_type: &str,
        selector: &Selector,
        changes: &Attributes,
        batch_size: usize,
    ) -> Result<u64, EngineError> {
        if batch_size == 0 {
            return Err(EngineError::InvalidBatchSize);
        }

        let mut total = 0u64;
        let mut after = None;
        loop {
            let size = self.pacer.batch_size(batch_size).max(1);
            let timer = Instant::now();
            let page = self.store.select(entity_type, selector, after, size)?;
            let Some(&(last, _)) = page.last() else {
                break;
            };
            after = Some(last);
            let exhausted = page.len() < size;

            let mut captured = Vec::with_capacity(page.len());
            let mut failure = None;
            for (id, mut attributes) in page {
                let prior: PriorAttributes = changes
                    .keys()
                    .map(|name| (name.clone(), attributes.get(name).cloned()))
                    .collect();
                for (name, value) in changes {
                    attributes.insert(name.clone(), value.clone());
                }
                if let Err(e) = self.store.put(entity_type, id, &attributes) {
                    failure = Some(e);
                    break;
                }
                captured.push((id, prior));
            }

            let rows = captured.len();
            if !captured.is_empty() {
                self.log.append(RollbackPayload::Updated {
                    entity_type: entity_type.to_string(),
                    changes: captured,
                });
            }
            if let Some(e) = failure {
                return Err(e.into());
            }

            total += rows as u64;
            self.after_batch("update", entity_type, rows, timer.elapsed());
            if exhausted {
                break;
            }
        }
        Ok(total)
    }

    /// Delete every record matching `selector`, in batches.
    ///
    /// For each relation named in `include_related` whose parent is
    /// `entity_type`, the related child rows are captured and deleted first.
    /// Returns the number of primary records removed.
    pub fn delete(
        &mut self,
        entity_type: &str,
        selector: &Selector,
        batch_size: usize,
        include_related: &[&str],
    ) -> Result<u64, EngineError> {
        if batch_size == 0 {
            return Err(EngineError::InvalidBatchSize);
        }
        let relations = self.related(entity_type, include_related)?;

        let mut total = 0u64;
        let mut after = None;
        loop {
            let size = self.pacer.batch_size(batch_size).max(1);
            let timer = Instant::now();
            let page = self.store.select(entity_type, selector, after, size)?;
            let Some(&(last, _)) = page.last() else {
                break;
            };
            after = Some(last);
            let exhausted = page.len() < size;

            let related = self.collect_related(&relations, &page)?;

            let mut removed_related = Vec::with_capacity(related.len());
            let mut snapshots = Vec::with_capacity(page.len());
            let mut failure = None;
            for row in related {
                match self.store.remove(&row.entity_type, row.id) {
                    Ok(_) => removed_related.push(row),
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                }
            }
            if failure.is_none() {
                for (id, attributes) in page {
                    match self.store.remove(entity_type, id) {
                        Ok(_) => snapshots.push((id, attributes)),
                        Err(e) => {
                            failure = Some(e);
                            break;
                        }
                    }
                }
            }

            let rows = snapshots.len();
            if !snapshots.is_empty() || !removed_related.is_empty() {
                self.log.append(RollbackPayload::Deleted {
                    entity_type: entity_type.to_string(),
                    snapshots,
                    related: removed_related,
                });
            }
            if let Some(e) = failure {
                return Err(e.into());
            }

            total += rows as u64;
            self.after_batch("delete", entity_type, rows, timer.elapsed());
            if exhausted {
                break;
            }
        }
        Ok(total)
    }

    fn related(&self, entity_type: &str, names: &[&str]) -> Result<Vec<RelationDef>, EngineError> {
        names
            .iter()
            .map(|name| {
                self.relations
                    .iter()
                    .find(|r| r.name == *name && r.from_entity == entity_type)
                    .cloned()
                    .ok_or_else(|| EngineError::UnknownRelation {
                        entity_type: entity_type.to_string(),
                        relation: name.to_string(),
                    })
            })
            .collect()
    }

    fn collect_related(
        &self,
        relations: &[RelationDef],
        parents: &[(RecordId, Attributes)],
    ) -> Result<Vec<RelatedSnapshot>, Error> {
        let mut seen = BTreeSet::new();
        let mut related = Vec::new();
        for relation in relations {
            for (parent_id, parent) in parents {
                let Some(children) = relation.children_of(*parent_id, parent) else {
                    continue;
                };
                let mut after = None;
                loop {
                    let page =
                        self.store
                            .select(&relation.to_entity, &children, after, RELATED_PAGE)?;
                    let Some(&(last, _)) = page.last() else {
                        break;
                    };
                    after = Some(last);
                    let exhausted = page.len() < RELATED_PAGE;
                    for (id, attributes) in page {
                        if seen.insert((relation.to_entity.clone(), id)) {
                            related.push(RelatedSnapshot {
                                entity_type: relation.to_entity.clone(),
                                id,
                                attributes,
                            });
                        }
                    }
                    if exhausted {
                        break;
                    }
                }
            }
        }
        Ok(related)
    }

    fn after_batch(&mut self, operation: &str, entity_type: &str, rows: usize, elapsed: Duration) {
        self.processed += rows as u64;
        let feedback = self.pacer.after_batch(rows, elapsed);

        debug!(
            operation,
            entity_type,
            rows,
            elapsed_ms = elapsed.as_millis() as u64,
            processed = self.processed,
            "Batch complete"
        );

        if let Some(progress) = &self.progress {
            progress.on_batch(rows as u64, feedback.sample.as_ref());
        }
        if feedback.reclaim {
            if let Err(e) = self.store.reclaim() {
                warn!(error = %e, "Failed to reclaim store memory");
            }
        }
        self.pacer.pause();
    }

    /// Undo every recorded batch, newest first, then clear the log.
    ///
    /// Stops at the first entry that cannot be undone; that entry and all
    /// older ones stay in the log.
    pub fn undo(&mut self) -> Result<(), RollbackFailure> {
        let mut undone = 0;
        let mut failure = None;
        for entry in self.log.iter_undo() {
            debug!(
                sequence = entry.sequence,
                operation = entry.payload.operation(),
                entity_type = entry.payload.entity_type(),
                rows = entry.payload.rows(),
                "Undoing batch"
            );
            if let Err(e) = undo_payload(self.store.as_ref(), &entry.payload) {
                error!(
                    sequence = entry.sequence,
                    operation = entry.payload.operation(),
                    error = %e,
                    "Undo failed"
                );
                failure = Some(RollbackFailure {
                    sequence: Some(entry.sequence),
                    operation: entry.payload.operation(),
                    error: Box::new(e),
                });
                break;
            }
            undone += 1;
        }

        match failure {
            Some(failure) => {
                self.truncate_undone(undone);
                Err(failure)
            }
            None => {
                self.log.clear();
                Ok(())
            }
        }
    }

    fn truncate_undone(&mut self, undone: usize) {
        let keep = self.log.len() - undone;
        self.log.truncate(keep);
    }

    /// Run `block`, retrying it on retryable failures per `policy`.
    ///
    /// Each attempt runs inside its own savepoint. A failed attempt leaves
    /// nothing behind: its writes are rolled back and its log entries are
    /// dropped before the next attempt starts.
    pub fn with_retry<T>(
        &mut self,
        policy: &RetryPolicy,
        mut block: impl FnMut(&mut Self) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let sleeper = Arc::clone(&self.sleeper);
        policy.execute(sleeper.as_ref(), |attempt| {
            let savepoint = self.store.savepoint()?;
            let logged = self.log.len();
            let processed = self.processed;

            match block(self) {
                Ok(value) => {
                    self.store.release_savepoint(savepoint)?;
                    Ok(value)
                }
                Err(err) => {
                    if let Err(e) = self.store.rollback_to_savepoint(savepoint) {
                        error!(attempt, error = %e, "Failed to discard retried attempt");
                        return Err(EngineError::RollbackFailed {
                            source: Box::new(err),
                            rollback: RollbackFailure {
                                sequence: None,
                                operation: "savepoint",
                                error: Box::new(e.into()),
                            },
                        });
                    }
                    debug!(
                        attempt,
                        discarded = self.log.len() - logged,
                        "Discarded failed attempt"
                    );
                    self.log.truncate(logged);
                    self.processed = processed;
                    Err(err)
                }
            }
        })
    }

    /// Check every declared relation, the registered checks, then `custom`.
    ///
    /// Returns the first violation found.
    pub fn verify_integrity(&self, custom: &[IntegrityCheck]) -> Result<(), EngineError> {
        let store: &dyn Store = self.store.as_ref();
        for relation in &self.relations {
            verify_relation(store, relation)?;
        }
        for check in self.checks.iter().chain(custom) {
            check.evaluate(store)?;
        }
        debug!(
            relations = self.relations.len(),
            checks = self.checks.len() + custom.len(),
            "Integrity verified"
        );
        Ok(())
    }

    /// Report a failure that does not abort the run.
    pub fn report_error(&self, message: &str, entity_id: Option<RecordId>) {
        warn!(
            migration = %self.config.migration_name,
            entity_id,
            reason = message,
            "Record failed during migration"
        );
        if let Some(progress) = &self.progress {
            progress.on_error(message, entity_id);
        }
    }
}

fn undo_payload<S: Store + ?Sized>(store: &S, payload: &RollbackPayload) -> Result<(), EngineError> {
    match payload {
        RollbackPayload::Created { entity_type, ids } => {
            for id in ids.iter().rev() {
                store.remove(entity_type, *id)?;
            }
        }
        RollbackPayload::Updated {
            entity_type,
            changes,
        } => {
            for (id, prior) in changes.iter().rev() {
                let mut current = store.get(entity_type, *id)?.ok_or_else(|| Error::NotFound {
                    entity_type: entity_type.clone(),
                    id: *id,
                })?;
                for (name, value) in prior {
                    match value {
                        Some(value) => {
                            current.insert(name.clone(), value.clone());
                        }
                        None => {
                            current.remove(name);
                        }
                    }
                }
                store.put(entity_type, *id, &current)?;
            }
        }
        RollbackPayload::Deleted {
            entity_type,
            snapshots,
            related,
        } => {
            for (id, attributes) in snapshots {
                store.put(entity_type, *id, attributes)?;
            }
            for row in related {
                store.put(&row.entity_type, row.id, &row.attributes)?;
            }
        }
    }
    Ok(())
}

impl<S: Store> std::fmt::Debug for ReversibleEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReversibleEngine")
            .field("migration", &self.config.migration_name)
            .field("state", &self.state)
            .field("rollback_entries", &self.log.len())
            .field("processed", &self.processed)
            .finish()
    }
}
