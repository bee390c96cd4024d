//! Read-only range queries: resolve a textual range expression, let the
//! range index narrow it to rowids, and stream the projected records to the
//! caller in whatever order the resolution yields them.
use std::path::Path;

use rusqlite::params;
use rusqlite::types::ValueRef;
use tracing::debug;

use crate::core::error::{Error, ErrorKind};
use crate::core::gri::{self, GenomicRange};
use crate::core::loader::{BEGIN_COL, END_COL, PAYLOAD_COL, RELATION, SEQUENCE_COL};
use crate::core::store;

/// One stored feature, projected back to text. `begin`/`end` come back as
/// whatever column affinity made of them at load time, rendered to text, so
/// numeric coordinates print as numbers and anything else round-trips.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FeatureRecord {
    pub sequence: String,
    pub begin: String,
    pub end: String,
    pub payload: String,
}

/// Resolve `expr` against the store at `store_path` and hand every
/// overlapping record to `on_record`. Returns the number of matches; zero
/// matches is success. Never mutates the store.
pub fn query_features<F>(store_path: &Path, expr: &str, mut on_record: F) -> Result<u64, Error>
where
    F: FnMut(&FeatureRecord) -> Result<(), Error>,
{
    let conn = store::open_read_only(store_path)?;
    let range = GenomicRange::parse(expr)?;
    debug!(sequence = %range.sequence, begin = range.begin, end = range.end, "range resolved");

    let sql = format!(
        "SELECT {SEQUENCE_COL}, {BEGIN_COL}, {END_COL}, {PAYLOAD_COL} \
         FROM {RELATION} WHERE _rowid_ IN ({})",
        gri::range_rowids_sql(RELATION, SEQUENCE_COL, BEGIN_COL, END_COL)
    );
    let mut stmt = conn.prepare(&sql).map_err(|err| {
        Error::new(ErrorKind::QueryPrepareFailed)
            .with_message("failed to prepare range query")
            .with_path(store_path)
            .with_source(err)
    })?;
    let mut rows = stmt
        .query(params![range.sequence, range.begin, range.end])
        .map_err(|err| {
            Error::new(ErrorKind::QueryStepFailed)
                .with_message("failed to start range query")
                .with_source(err)
        })?;

    let mut matched = 0u64;
    loop {
        let row = rows.next().map_err(|err| {
            Error::new(ErrorKind::QueryStepFailed)
                .with_message("failed to fetch next record")
                .with_source(err)
        })?;
        let Some(row) = row else {
            break;
        };
        let record = FeatureRecord {
            sequence: field_text(row, 0)?,
            begin: field_text(row, 1)?,
            end: field_text(row, 2)?,
            payload: field_text(row, 3)?,
        };
        on_record(&record)?;
        matched += 1;
    }
    debug!(matched, "range query finished");
    Ok(matched)
}

fn field_text(row: &rusqlite::Row<'_>, idx: usize) -> Result<String, Error> {
    let value = row.get_ref(idx).map_err(|err| {
        Error::new(ErrorKind::QueryStepFailed)
            .with_message("failed to read column")
            .with_source(err)
    })?;
    Ok(match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(value) => value.to_string(),
        ValueRef::Real(value) => value.to_string(),
        ValueRef::Text(text) | ValueRef::Blob(text) => String::from_utf8_lossy(text).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::PathBuf;

    use super::{FeatureRecord, query_features};
    use crate::core::error::ErrorKind;
    use crate::core::{loader, store};

    fn loaded_store(dir: &std::path::Path, contents: &str) -> PathBuf {
        store::init().expect("init");
        let input = dir.join("input.gff");
        let mut file = std::fs::File::create(&input).expect("create input");
        file.write_all(contents.as_bytes()).expect("write input");
        let store_path = dir.join("features.db");
        loader::load(&input, &store_path).expect("load");
        store_path
    }

    fn collect(store_path: &std::path::Path, expr: &str) -> Vec<FeatureRecord> {
        let mut records = Vec::new();
        query_features(store_path, expr, |record| {
            records.push(record.clone());
            Ok(())
        })
        .expect("query");
        records
    }

    #[test]
    fn overlap_matches_and_misses() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store_path = loaded_store(temp.path(), "chr1\t100\t200\tgeneA\n");

        let hit = collect(&store_path, "chr1:150-160");
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].sequence, "chr1");
        assert_eq!(hit[0].begin, "100");
        assert_eq!(hit[0].end, "200");
        assert_eq!(hit[0].payload, "geneA");

        assert!(collect(&store_path, "chr1:201-300").is_empty());
        assert!(collect(&store_path, "chr2:100-200").is_empty());
    }

    #[test]
    fn boundary_coordinates_overlap() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store_path = loaded_store(temp.path(), "chr1\t100\t200\tgeneA\n");
        assert_eq!(collect(&store_path, "chr1:200-300").len(), 1);
        assert_eq!(collect(&store_path, "chr1:1-100").len(), 1);
    }

    #[test]
    fn payload_with_embedded_tabs_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store_path = loaded_store(temp.path(), "chr1\t100\t200\tgeneA\tscore=5\tnote\n");
        let records = collect(&store_path, "chr1:1-1000");
        assert_eq!(records[0].payload, "geneA\tscore=5\tnote");
    }

    // Inverted intervals are stored as written and the overlap predicate is
    // applied to the stored values: an interior query misses, a spanning
    // query hits.
    #[test]
    fn inverted_record_interval_is_stored_as_written() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store_path = loaded_store(temp.path(), "chr1\t200\t100\tinverted\n");
        assert!(collect(&store_path, "chr1:150-160").is_empty());
        let spanning = collect(&store_path, "chr1:1-1000");
        assert_eq!(spanning.len(), 1);
        assert_eq!(spanning[0].begin, "200");
        assert_eq!(spanning[0].end, "100");
    }

    #[test]
    fn invalid_expression_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store_path = loaded_store(temp.path(), "chr1\t100\t200\tgeneA\n");
        let err = query_features(&store_path, "chr1", |_| Ok(())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RangeExpressionInvalid);
    }

    #[test]
    fn store_without_relation_fails_at_prepare() {
        store::init().expect("init");
        let temp = tempfile::tempdir().expect("tempdir");
        let store_path = temp.path().join("empty.db");
        let conn = rusqlite::Connection::open(&store_path).expect("create empty store");
        // Force the file into existence; SQLite creates it lazily.
        conn.execute_batch("CREATE TABLE misc(x)").expect("seed");
        let err = query_features(&store_path, "chr1:1-10", |_| Ok(())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::QueryPrepareFailed);
    }
}
