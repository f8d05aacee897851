use qorch_core::errors::{ErrorInfo, QorchError};
use rusqlite::{params, Connection, OptionalExtension};

pub const SCHEMA_VERSION: i64 = 1;

pub fn init_schema(conn: &Connection) -> Result<(), QorchError> {
    conn.execute_batch(
        "BEGIN;
        CREATE TABLE IF NOT EXISTS meta(version INTEGER NOT NULL);
        CREATE TABLE IF NOT EXISTS batches(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner TEXT NOT NULL,
            backend TEXT NOT NULL,
            mode TEXT NOT NULL CHECK(mode IN ('remote', 'local')),
            shots INTEGER NOT NULL CHECK(shots > 0),
            runs INTEGER NOT NULL CHECK(runs > 0),
            job_handle TEXT,
            status TEXT NOT NULL
                CHECK(status IN ('unsubmitted', 'pending', 'executed', 'done', 'error')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS batches_by_status ON batches(status, job_handle);
        CREATE TABLE IF NOT EXISTS variants(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_id INTEGER NOT NULL,
            ordinal INTEGER NOT NULL,
            circuit_name TEXT NOT NULL,
            circuit TEXT NOT NULL,
            technique TEXT NOT NULL,
            noise_level REAL,
            mapping TEXT NOT NULL,
            compile_seconds REAL NOT NULL,
            UNIQUE(batch_id, ordinal),
            FOREIGN KEY(batch_id) REFERENCES batches(id)
        );
        CREATE TABLE IF NOT EXISTS raw_results(
            variant_id INTEGER PRIMARY KEY,
            mean TEXT NOT NULL,
            std_dev TEXT NOT NULL,
            circuit TEXT NOT NULL,
            shots INTEGER NOT NULL,
            measure_mapping TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(variant_id) REFERENCES variants(id)
        );
        CREATE TABLE IF NOT EXISTS metrics(
            variant_id INTEGER PRIMARY KEY,
            total_gates INTEGER NOT NULL,
            one_qubit_gates INTEGER NOT NULL,
            two_qubit_gates INTEGER NOT NULL,
            depth INTEGER NOT NULL,
            success_rate REAL,
            accepted INTEGER,
            logical_errors INTEGER,
            undecided INTEGER,
            detection_seconds REAL,
            decoding_seconds REAL,
            decode_error TEXT,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(variant_id) REFERENCES variants(id)
        );
        COMMIT;",
    )
    .map_err(|err| QorchError::Store(ErrorInfo::new("qorch_store.schema", err.to_string())))?;
    set_version(conn, SCHEMA_VERSION)?;
    Ok(())
}

fn set_version(conn: &Connection, version: i64) -> Result<(), QorchError> {
    let existing: Option<i64> = conn
        .query_row("SELECT version FROM meta LIMIT 1", [], |row| row.get(0))
        .optional()
        .map_err(|err| QorchError::Store(ErrorInfo::new("qorch_store.schema", err.to_string())))?;
    match existing {
        Some(current) if current == version => Ok(()),
        Some(current) => Err(QorchError::Store(ErrorInfo::new(
            "qorch_store.schema_version",
            format!("store schema {current} incompatible with expected {version}"),
        ))),
        None => {
            conn.execute("INSERT INTO meta(version) VALUES (?)", params![version])
                .map_err(|err| {
                    QorchError::Store(ErrorInfo::new("qorch_store.schema", err.to_string()))
                })?;
            Ok(())
        }
    }
}
