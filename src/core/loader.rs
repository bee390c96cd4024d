//! Transactional bulk load: stream GFF lines into a freshly created,
//! range-indexed relation, all inside one transaction.
//!
//! Either every line loads, the index is built, and the transaction commits,
//! or the store is left exactly as it was. There is no line skipping and no
//! retry; a mis-parsed coordinate silently corrupting the index is strictly
//! worse than a failed load.
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use rusqlite::params;
use tracing::debug;

use crate::core::error::{Error, ErrorKind};
use crate::core::gri;
use crate::core::store;

/// Name of the feature relation inside a store, and its column names.
/// `begin`/`end` carry a `_pos` suffix because both are SQL keywords.
pub const RELATION: &str = "gff";
pub const SEQUENCE_COL: &str = "sequence";
pub const BEGIN_COL: &str = "begin_pos";
pub const END_COL: &str = "end_pos";
pub const PAYLOAD_COL: &str = "payload";

const CREATE_RELATION_SQL: &str = "CREATE TABLE gff(\
     sequence TEXT COLLATE UINT, \
     begin_pos INTEGER, \
     end_pos INTEGER, \
     payload TEXT)";

const INSERT_SQL: &str =
    "INSERT INTO gff(sequence, begin_pos, end_pos, payload) VALUES (?1, ?2, ?3, ?4)";

/// Decompose one line (trailing newlines already stripped) into its four
/// fields. Only the first three tabs split; the payload keeps any further
/// embedded tabs verbatim. A line with three fields and a trailing tab is
/// valid with an empty payload; without the trailing tab it is malformed.
pub fn parse_record(line: &str) -> Result<(&str, &str, &str, &str), Error> {
    let mut fields = line.splitn(4, '\t');
    match (fields.next(), fields.next(), fields.next(), fields.next()) {
        (Some(sequence), Some(begin), Some(end), Some(payload)) => {
            Ok((sequence, begin, end, payload))
        }
        _ => Err(Error::new(ErrorKind::MalformedRecord)
            .with_message("expected four tab-separated fields")),
    }
}

/// Load a GFF source file into a new store and return the record count.
///
/// One transaction spans relation creation, every insert, and the range
/// index build; any failure drops the transaction and rolls everything
/// back. `begin`/`end` are bound as text and coerced by column affinity;
/// records with `begin > end` are stored as written.
pub fn load(input: &Path, store_path: &Path) -> Result<u64, Error> {
    let file = File::open(input).map_err(|err| {
        Error::new(ErrorKind::SourceUnreadable)
            .with_message("failed to open input")
            .with_path(input)
            .with_source(err)
    })?;
    let mut reader = BufReader::new(file);

    let mut conn = store::open_for_load(store_path)?;
    let tx = conn.transaction().map_err(|err| {
        Error::new(ErrorKind::StoreUnavailable)
            .with_message("failed to begin load transaction")
            .with_path(store_path)
            .with_source(err)
    })?;

    tx.execute_batch(CREATE_RELATION_SQL).map_err(|err| {
        Error::new(ErrorKind::RelationCreateFailed)
            .with_message(format!("failed to create relation {RELATION}"))
            .with_path(store_path)
            .with_source(err)
    })?;

    // One prepared insert for the whole load; rusqlite resets it on every
    // execute, so parse/plan cost is paid once.
    let count = {
        let mut insert = tx.prepare(INSERT_SQL).map_err(|err| {
            Error::new(ErrorKind::StatementPrepareFailed)
                .with_message("failed to prepare insert")
                .with_source(err)
        })?;

        let mut line = String::new();
        let mut line_no = 0u64;
        let mut count = 0u64;
        loop {
            line.clear();
            let read = reader.read_line(&mut line).map_err(|err| {
                Error::new(ErrorKind::SourceUnreadable)
                    .with_message("failed to read input")
                    .with_path(input)
                    .with_source(err)
            })?;
            if read == 0 {
                break;
            }
            line_no += 1;
            let trimmed = line.trim_end_matches(['\n', '\r']);
            if trimmed.is_empty() {
                continue;
            }
            let (sequence, begin, end, payload) =
                parse_record(trimmed).map_err(|err| err.with_path(input).with_line(line_no))?;
            insert
                .execute(params![sequence, begin, end, payload])
                .map_err(|err| {
                    Error::new(ErrorKind::InsertFailed)
                        .with_message("failed to insert record")
                        .with_line(line_no)
                        .with_source(err)
                })?;
            count += 1;
        }
        count
    };

    debug!(count, "records inserted, building range index");
    tx.execute_batch(&gri::create_range_index_sql(
        RELATION,
        SEQUENCE_COL,
        BEGIN_COL,
        END_COL,
    ))
    .map_err(|err| {
        Error::new(ErrorKind::IndexBuildFailed)
            .with_message("failed to build range index")
            .with_path(store_path)
            .with_source(err)
    })?;

    tx.commit().map_err(|err| {
        Error::new(ErrorKind::CommitFailed)
            .with_message("failed to commit load transaction")
            .with_path(store_path)
            .with_source(err)
    })?;
    debug!(count, store = %store_path.display(), "load committed");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::PathBuf;

    use super::{load, parse_record};
    use crate::core::error::ErrorKind;
    use crate::core::store;

    fn write_source(dir: &std::path::Path, contents: &str) -> PathBuf {
        let path = dir.join("input.gff");
        let mut file = std::fs::File::create(&path).expect("create input");
        file.write_all(contents.as_bytes()).expect("write input");
        path
    }

    #[test]
    fn splits_on_first_three_tabs_only() {
        let (sequence, begin, end, payload) =
            parse_record("chr1\t100\t200\tgeneA\textra\tfields").expect("parse");
        assert_eq!(sequence, "chr1");
        assert_eq!(begin, "100");
        assert_eq!(end, "200");
        assert_eq!(payload, "geneA\textra\tfields");
    }

    #[test]
    fn trailing_tab_yields_empty_payload() {
        let (_, _, _, payload) = parse_record("chr1\t100\t200\t").expect("parse");
        assert_eq!(payload, "");
    }

    #[test]
    fn three_fields_without_payload_is_malformed() {
        let err = parse_record("chr1\t100\t200").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRecord);
        let err = parse_record("chr1\t100").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRecord);
    }

    #[test]
    fn load_counts_non_blank_lines_only() {
        store::init().expect("init");
        let temp = tempfile::tempdir().expect("tempdir");
        let input = write_source(
            temp.path(),
            "chr1\t100\t200\tgeneA\n\nchr1\t300\t400\tgeneB\n\n",
        );
        let store_path = temp.path().join("features.db");
        let count = load(&input, &store_path).expect("load");
        assert_eq!(count, 2);
    }

    #[test]
    fn malformed_line_rolls_back_everything() {
        store::init().expect("init");
        let temp = tempfile::tempdir().expect("tempdir");
        let input = write_source(
            temp.path(),
            "chr1\t100\t200\tgeneA\nchr1\t300\t400\n",
        );
        let store_path = temp.path().join("features.db");
        let err = load(&input, &store_path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRecord);
        assert_eq!(err.line(), Some(2));

        // The relation must not exist after the failed load.
        let conn = rusqlite::Connection::open(&store_path).expect("open");
        let tables: i64 = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = 'gff'",
                [],
                |row| row.get(0),
            )
            .expect("introspect");
        assert_eq!(tables, 0);
    }

    // Sources are text: the first invalid UTF-8 byte aborts the load
    // instead of persisting payloads that cannot round-trip.
    #[test]
    fn non_utf8_source_aborts_the_load() {
        store::init().expect("init");
        let temp = tempfile::tempdir().expect("tempdir");
        let input = temp.path().join("input.gff");
        let mut file = std::fs::File::create(&input).expect("create input");
        file.write_all(b"chr1\t100\t200\tgeneA\nchr1\t300\t400\t\xff\xfe\n")
            .expect("write input");
        let store_path = temp.path().join("features.db");
        let err = load(&input, &store_path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceUnreadable);
    }

    #[test]
    fn loading_twice_into_same_store_fails_on_existing_relation() {
        store::init().expect("init");
        let temp = tempfile::tempdir().expect("tempdir");
        let input = write_source(temp.path(), "chr1\t100\t200\tgeneA\n");
        let store_path = temp.path().join("features.db");
        load(&input, &store_path).expect("first load");
        let err = load(&input, &store_path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RelationCreateFailed);
    }
}
