use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use qorch_core::errors::{ErrorInfo, QorchError, STALE_TRANSITION};
use qorch_core::{
    BatchId, BatchRecord, BatchStatus, JobHandle, MetricRecord, NewBatch, NewVariant,
    RawResultRecord, VariantId, VariantRecord,
};
use rusqlite::{params, Connection, OptionalExtension, Params, Row};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::schema::init_schema;

const BATCH_COLUMNS: &str =
    "b.id, b.owner, b.backend, b.mode, b.shots, b.runs, b.job_handle, b.status, b.created_at, b.updated_at";

const VARIANT_COLUMNS: &str = "v.id, v.batch_id, v.ordinal, v.circuit_name, v.circuit, v.technique, v.noise_level, v.mapping, v.compile_seconds";

/// Typed access to the orchestration ledger. The only writer of durable state.
pub struct Store {
    pub(crate) conn: Connection,
}

pub(crate) fn store_error(code: &str, err: impl ToString) -> QorchError {
    QorchError::Store(ErrorInfo::new(code, err.to_string()))
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

fn to_json<T: Serialize + ?Sized>(value: &T, code: &str) -> Result<String, QorchError> {
    serde_json::to_string(value)
        .map_err(|err| QorchError::Serde(ErrorInfo::new(code, err.to_string())))
}

fn from_json<T: DeserializeOwned>(text: &str, code: &str) -> Result<T, QorchError> {
    serde_json::from_str(text)
        .map_err(|err| QorchError::Serde(ErrorInfo::new(code, err.to_string())))
}

struct BatchRow {
    id: i64,
    owner: String,
    backend: String,
    mode: String,
    shots: i64,
    runs: i64,
    handle: Option<String>,
    status: String,
    created_at: String,
    updated_at: String,
}

impl BatchRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner: row.get(1)?,
            backend: row.get(2)?,
            mode: row.get(3)?,
            shots: row.get(4)?,
            runs: row.get(5)?,
            handle: row.get(6)?,
            status: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    fn into_record(self) -> Result<BatchRecord, QorchError> {
        Ok(BatchRecord {
            id: BatchId::from_raw(self.id),
            user: self.owner,
            backend: self.backend,
            mode: self.mode.parse()?,
            shots: self.shots as u32,
            runs: self.runs as u32,
            handle: self.handle.map(JobHandle::new),
            status: self.status.parse()?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

struct VariantRow {
    id: i64,
    batch_id: i64,
    ordinal: i64,
    circuit_name: String,
    circuit: String,
    technique: String,
    noise_level: Option<f64>,
    mapping: String,
    compile_seconds: f64,
}

impl VariantRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            batch_id: row.get(1)?,
            ordinal: row.get(2)?,
            circuit_name: row.get(3)?,
            circuit: row.get(4)?,
            technique: row.get(5)?,
            noise_level: row.get(6)?,
            mapping: row.get(7)?,
            compile_seconds: row.get(8)?,
        })
    }

    fn into_record(self) -> Result<VariantRecord, QorchError> {
        Ok(VariantRecord {
            id: VariantId::from_raw(self.id),
            batch_id: BatchId::from_raw(self.batch_id),
            ordinal: self.ordinal as u32,
            circuit_name: self.circuit_name,
            circuit: self.circuit,
            technique: self.technique,
            noise_level: self.noise_level,
            mapping: from_json(&self.mapping, "qorch_store.variant_mapping")?,
            compile_seconds: self.compile_seconds,
        })
    }
}

impl Store {
    /// Opens (creating if needed) the database at `path` and ensures the schema.
    pub fn open(path: &Path) -> Result<Self, QorchError> {
        let conn = Connection::open(path).map_err(|err| {
            QorchError::Store(
                ErrorInfo::new("qorch_store.open", err.to_string())
                    .with_context("path", path.display()),
            )
        })?;
        Self::from_connection(conn)
    }

    /// Private in-memory store, used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self, QorchError> {
        let conn =
            Connection::open_in_memory().map_err(|err| store_error("qorch_store.open", err))?;
        Self::from_connection(conn)
    }

    pub fn from_connection(conn: Connection) -> Result<Self, QorchError> {
        // Concurrent passes from other processes hold short write locks.
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(|err| store_error("qorch_store.pragma", err))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|err| store_error("qorch_store.pragma", err))?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Registers a batch header and its ordered variants in one transaction.
    pub fn insert_batch(
        &mut self,
        batch: &NewBatch,
        variants: &[NewVariant],
    ) -> Result<BatchId, QorchError> {
        if variants.is_empty() {
            return Err(QorchError::Store(
                ErrorInfo::new("qorch_store.empty_batch", "a batch needs at least one variant")
                    .with_context("backend", &batch.backend),
            ));
        }
        let stamp = now();
        let tx = self
            .conn
            .transaction()
            .map_err(|err| store_error("qorch_store.transaction", err))?;
        tx.execute(
            "INSERT INTO batches(owner, backend, mode, shots, runs, job_handle, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, ?7, ?7)",
            params![
                batch.user,
                batch.backend,
                batch.mode.as_str(),
                batch.shots,
                batch.runs,
                BatchStatus::Unsubmitted.as_str(),
                stamp,
            ],
        )
        .map_err(|err| store_error("qorch_store.insert_batch", err))?;
        let batch_id = tx.last_insert_rowid();
        for (ordinal, variant) in variants.iter().enumerate() {
            let mapping = to_json(&variant.mapping, "qorch_store.variant_mapping")?;
            tx.execute(
                "INSERT INTO variants(batch_id, ordinal, circuit_name, circuit, technique, noise_level, mapping, compile_seconds)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    batch_id,
                    ordinal as i64,
                    variant.circuit_name,
                    variant.circuit,
                    variant.technique,
                    variant.noise_level,
                    mapping,
                    variant.compile_seconds,
                ],
            )
            .map_err(|err| store_error("qorch_store.insert_variant", err))?;
        }
        tx.commit()
            .map_err(|err| store_error("qorch_store.commit", err))?;
        debug!(batch_id, variants = variants.len(), "registered batch");
        Ok(BatchId::from_raw(batch_id))
    }

    pub fn batch(&self, id: BatchId) -> Result<Option<BatchRecord>, QorchError> {
        let sql = format!("SELECT {BATCH_COLUMNS} FROM batches b WHERE b.id = ?1");
        let row = self
            .conn
            .query_row(&sql, [id.as_raw()], BatchRow::read)
            .optional()
            .map_err(|err| store_error("qorch_store.query", err))?;
        row.map(BatchRow::into_record).transpose()
    }

    /// Batches registered but never dispatched.
    pub fn batches_awaiting_submission(&self) -> Result<Vec<BatchRecord>, QorchError> {
        self.query_batches(
            "WHERE b.status = ?1 AND b.job_handle IS NULL",
            [BatchStatus::Unsubmitted.as_str()],
        )
    }

    pub fn pending_batches(&self) -> Result<Vec<BatchRecord>, QorchError> {
        self.query_batches("WHERE b.status = ?1", [BatchStatus::Pending.as_str()])
    }

    pub fn pending_batches_for_handle(
        &self,
        handle: &JobHandle,
    ) -> Result<Vec<BatchRecord>, QorchError> {
        self.query_batches(
            "WHERE b.status = ?1 AND b.job_handle = ?2",
            [BatchStatus::Pending.as_str(), handle.as_str()],
        )
    }

    pub fn executed_batches(&self) -> Result<Vec<BatchRecord>, QorchError> {
        self.query_batches("WHERE b.status = ?1", [BatchStatus::Executed.as_str()])
    }

    fn query_batches<P: Params>(
        &self,
        filter: &str,
        params: P,
    ) -> Result<Vec<BatchRecord>, QorchError> {
        let sql = format!("SELECT {BATCH_COLUMNS} FROM batches b {filter} ORDER BY b.id");
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|err| store_error("qorch_store.query", err))?;
        let rows = stmt
            .query_map(params, BatchRow::read)
            .map_err(|err| store_error("qorch_store.query", err))?;
        let rows = rows
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| store_error("qorch_store.query", err))?;
        rows.into_iter().map(BatchRow::into_record).collect()
    }

    /// Variants of a batch in submission order.
    pub fn variants_for_batch(&self, batch: BatchId) -> Result<Vec<VariantRecord>, QorchError> {
        self.query_variants("WHERE v.batch_id = ?1", [batch.as_raw()])
    }

    /// Variants of a pending batch that have no raw result yet.
    pub fn variants_awaiting_results(
        &self,
        batch: BatchId,
    ) -> Result<Vec<VariantRecord>, QorchError> {
        self.query_variants(
            "INNER JOIN batches b ON b.id = v.batch_id
             LEFT JOIN raw_results r ON r.variant_id = v.id
             WHERE v.batch_id = ?1 AND b.status = 'pending' AND r.variant_id IS NULL",
            [batch.as_raw()],
        )
    }

    /// Variants with a raw result but no metric row, or a metric row whose decode failed.
    pub fn variants_pending_metrics(
        &self,
        batch: BatchId,
    ) -> Result<Vec<VariantRecord>, QorchError> {
        self.query_variants(
            "INNER JOIN raw_results r ON r.variant_id = v.id
             LEFT JOIN metrics m ON m.variant_id = v.id
             WHERE v.batch_id = ?1 AND (m.variant_id IS NULL OR m.decode_error IS NOT NULL)",
            [batch.as_raw()],
        )
    }

    fn query_variants<P: Params>(
        &self,
        filter: &str,
        params: P,
    ) -> Result<Vec<VariantRecord>, QorchError> {
        let sql = format!("SELECT {VARIANT_COLUMNS} FROM variants v {filter} ORDER BY v.ordinal");
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|err| store_error("qorch_store.query", err))?;
        let rows = stmt
            .query_map(params, VariantRow::read)
            .map_err(|err| store_error("qorch_store.query", err))?;
        let rows = rows
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| store_error("qorch_store.query", err))?;
        rows.into_iter().map(VariantRow::into_record).collect()
    }

    /// Records the submission handle and moves the batch to `pending`.
    pub fn mark_submitted(&self, batch: BatchId, handle: &JobHandle) -> Result<(), QorchError> {
        let changed = self
            .conn
            .execute(
                "UPDATE batches SET job_handle = ?1, status = ?2, updated_at = ?3
                 WHERE id = ?4 AND status = ?5 AND job_handle IS NULL",
                params![
                    handle.as_str(),
                    BatchStatus::Pending.as_str(),
                    now(),
                    batch.as_raw(),
                    BatchStatus::Unsubmitted.as_str(),
                ],
            )
            .map_err(|err| store_error("qorch_store.mark_submitted", err))?;
        if changed == 0 {
            return Err(stale_error(
                &self.conn,
                batch,
                BatchStatus::Unsubmitted,
                BatchStatus::Pending,
            ));
        }
        Ok(())
    }

    /// Moves a batch between states, enforcing the legal-transition table.
    pub fn transition(
        &self,
        batch: BatchId,
        from: BatchStatus,
        to: BatchStatus,
    ) -> Result<(), QorchError> {
        from.check_transition(to)?;
        if compare_and_set(&self.conn, batch, from, to)? == 0 {
            return Err(stale_error(&self.conn, batch, from, to));
        }
        debug!(batch_id = batch.as_raw(), %from, %to, "batch transition");
        Ok(())
    }

    pub fn upsert_raw_result(&self, record: &RawResultRecord) -> Result<(), QorchError> {
        write_raw_result(&self.conn, record, &now())
    }

    /// Upserts every raw result of a pending batch and marks it `executed`, atomically.
    pub fn record_batch_results(
        &mut self,
        batch: BatchId,
        records: &[RawResultRecord],
    ) -> Result<(), QorchError> {
        let stamp = now();
        let tx = self
            .conn
            .transaction()
            .map_err(|err| store_error("qorch_store.transaction", err))?;
        for record in records {
            write_raw_result(&tx, record, &stamp)?;
        }
        if compare_and_set(&tx, batch, BatchStatus::Pending, BatchStatus::Executed)? == 0 {
            return Err(stale_error(
                &tx,
                batch,
                BatchStatus::Pending,
                BatchStatus::Executed,
            ));
        }
        tx.commit()
            .map_err(|err| store_error("qorch_store.commit", err))
    }

    pub fn upsert_metric(&self, record: &MetricRecord) -> Result<(), QorchError> {
        self.conn
            .execute(
                "INSERT INTO metrics(variant_id, total_gates, one_qubit_gates, two_qubit_gates, depth,
                    success_rate, accepted, logical_errors, undecided, detection_seconds,
                    decoding_seconds, decode_error, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                 ON CONFLICT(variant_id) DO UPDATE SET
                    total_gates = excluded.total_gates,
                    one_qubit_gates = excluded.one_qubit_gates,
                    two_qubit_gates = excluded.two_qubit_gates,
                    depth = excluded.depth,
                    success_rate = excluded.success_rate,
                    accepted = excluded.accepted,
                    logical_errors = excluded.logical_errors,
                    undecided = excluded.undecided,
                    detection_seconds = excluded.detection_seconds,
                    decoding_seconds = excluded.decoding_seconds,
                    decode_error = excluded.decode_error,
                    updated_at = excluded.updated_at",
                params![
                    record.variant_id.as_raw(),
                    record.total_gates as i64,
                    record.one_qubit_gates as i64,
                    record.two_qubit_gates as i64,
                    record.depth as i64,
                    record.success_rate,
                    record.accepted.map(|v| v as i64),
                    record.logical_errors.map(|v| v as i64),
                    record.undecided.map(|v| v as i64),
                    record.detection_seconds,
                    record.decoding_seconds,
                    record.decode_error,
                    now(),
                ],
            )
            .map_err(|err| {
                QorchError::Store(
                    ErrorInfo::new("qorch_store.upsert_metric", err.to_string())
                        .with_context("variant_id", record.variant_id),
                )
            })?;
        Ok(())
    }

    pub fn raw_result(&self, variant: VariantId) -> Result<Option<RawResultRecord>, QorchError> {
        let row = self
            .conn
            .query_row(
                "SELECT mean, std_dev, circuit, shots, measure_mapping FROM raw_results WHERE variant_id = ?1",
                [variant.as_raw()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()
            .map_err(|err| store_error("qorch_store.query", err))?;
        let Some((mean, std_dev, circuit, shots, measure_mapping)) = row else {
            return Ok(None);
        };
        Ok(Some(RawResultRecord {
            variant_id: variant,
            mean: from_json(&mean, "qorch_store.raw_mean")?,
            std_dev: from_json(&std_dev, "qorch_store.raw_std_dev")?,
            circuit,
            shots: shots as u32,
            measure_mapping: from_json(&measure_mapping, "qorch_store.raw_mapping")?,
        }))
    }

    pub fn metric(&self, variant: VariantId) -> Result<Option<MetricRecord>, QorchError> {
        self.conn
            .query_row(
                "SELECT total_gates, one_qubit_gates, two_qubit_gates, depth, success_rate, accepted,
                    logical_errors, undecided, detection_seconds, decoding_seconds, decode_error
                 FROM metrics WHERE variant_id = ?1",
                [variant.as_raw()],
                |row| {
                    Ok(MetricRecord {
                        variant_id: variant,
                        total_gates: row.get::<_, i64>(0)? as u64,
                        one_qubit_gates: row.get::<_, i64>(1)? as u64,
                        two_qubit_gates: row.get::<_, i64>(2)? as u64,
                        depth: row.get::<_, i64>(3)? as u64,
                        success_rate: row.get(4)?,
                        accepted: row.get::<_, Option<i64>>(5)?.map(|v| v as u64),
                        logical_errors: row.get::<_, Option<i64>>(6)?.map(|v| v as u64),
                        undecided: row.get::<_, Option<i64>>(7)?.map(|v| v as u64),
                        detection_seconds: row.get(8)?,
                        decoding_seconds: row.get(9)?,
                        decode_error: row.get(10)?,
                    })
                },
            )
            .optional()
            .map_err(|err| store_error("qorch_store.query", err))
    }

    /// Number of variants of `batch` whose last metrics pass recorded a decode failure.
    pub fn decode_failures(&self, batch: BatchId) -> Result<u64, QorchError> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM metrics m INNER JOIN variants v ON v.id = m.variant_id
                 WHERE v.batch_id = ?1 AND m.decode_error IS NOT NULL",
                [batch.as_raw()],
                |row| row.get(0),
            )
            .map_err(|err| store_error("qorch_store.query", err))?;
        Ok(count as u64)
    }
}

fn write_raw_result(
    conn: &Connection,
    record: &RawResultRecord,
    stamp: &str,
) -> Result<(), QorchError> {
    let mean = to_json(&record.mean, "qorch_store.raw_mean")?;
    let std_dev = to_json(&record.std_dev, "qorch_store.raw_std_dev")?;
    let mapping = to_json(&record.measure_mapping, "qorch_store.raw_mapping")?;
    conn.execute(
        "INSERT INTO raw_results(variant_id, mean, std_dev, circuit, shots, measure_mapping, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(variant_id) DO UPDATE SET
            mean = excluded.mean,
            std_dev = excluded.std_dev,
            circuit = excluded.circuit,
            shots = excluded.shots,
            measure_mapping = excluded.measure_mapping,
            updated_at = excluded.updated_at",
        params![
            record.variant_id.as_raw(),
            mean,
            std_dev,
            record.circuit,
            record.shots,
            mapping,
            stamp,
        ],
    )
    .map_err(|err| {
        QorchError::Store(
            ErrorInfo::new("qorch_store.upsert_raw", err.to_string())
                .with_context("variant_id", record.variant_id),
        )
    })?;
    Ok(())
}

fn compare_and_set(
    conn: &Connection,
    batch: BatchId,
    from: BatchStatus,
    to: BatchStatus,
) -> Result<usize, QorchError> {
    conn.execute(
        "UPDATE batches SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
        params![to.as_str(), now(), batch.as_raw(), from.as_str()],
    )
    .map_err(|err| store_error("qorch_store.transition", err))
}

fn stale_error(
    conn: &Connection,
    batch: BatchId,
    from: BatchStatus,
    to: BatchStatus,
) -> QorchError {
    let current: Result<Option<String>, _> = conn
        .query_row(
            "SELECT status FROM batches WHERE id = ?1",
            [batch.as_raw()],
            |row| row.get(0),
        )
        .optional();
    match current {
        Ok(Some(current)) => QorchError::Transition(
            ErrorInfo::new(
                STALE_TRANSITION,
                format!("batch is {current}, expected {from}"),
            )
            .with_context("batch_id", batch)
            .with_context("to", to),
        ),
        Ok(None) => QorchError::Store(
            ErrorInfo::new("qorch_store.batch_missing", "no batch with this id")
                .with_context("batch_id", batch),
        ),
        Err(err) => store_error("qorch_store.query", err),
    }
}
