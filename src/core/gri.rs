//! Genomic range index (GRI) capability over the SQLite store.
//!
//! Everything the rest of the crate needs to know about range indexing lives
//! behind three typed entry points: the `UINT` collation for chromosome-name
//! ordering, the index-build SQL fragment, and the rowid-resolution SQL
//! fragment. Range expressions ("chr1:1,000-2,000") are resolved here too.
//! Callers never build these SQL strings themselves.
use std::cmp::Ordering;

use rusqlite::Connection;

use crate::core::error::{Error, ErrorKind};

/// Name of the collation registered on every store connection.
pub const COLLATION: &str = "UINT";

/// A resolved range expression: target sequence plus a closed interval.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GenomicRange {
    pub sequence: String,
    pub begin: i64,
    pub end: i64,
}

impl GenomicRange {
    /// Resolve a textual range expression of the form `SEQ:BEGIN-END`.
    ///
    /// The split is on the last colon, since sequence names may themselves
    /// contain colons (e.g. HLA contigs). Coordinates may carry thousands
    /// separators and are taken at face value, closed interval; no
    /// reordering happens when `begin > end`.
    pub fn parse(expr: &str) -> Result<Self, Error> {
        let invalid = |detail: &str| {
            Error::new(ErrorKind::RangeExpressionInvalid)
                .with_message(format!("{detail} in {expr:?}"))
        };
        let (sequence, interval) = expr
            .rsplit_once(':')
            .ok_or_else(|| invalid("expected SEQ:BEGIN-END"))?;
        if sequence.is_empty() {
            return Err(invalid("empty sequence name"));
        }
        let (begin, end) = interval
            .split_once('-')
            .ok_or_else(|| invalid("expected BEGIN-END interval"))?;
        Ok(Self {
            sequence: sequence.to_string(),
            begin: parse_coordinate(begin).ok_or_else(|| invalid("unparseable begin"))?,
            end: parse_coordinate(end).ok_or_else(|| invalid("unparseable end"))?,
        })
    }
}

fn parse_coordinate(text: &str) -> Option<i64> {
    let mut value: i64 = 0;
    let mut saw_digit = false;
    for c in text.chars() {
        match c {
            ',' => continue,
            '0'..='9' => {
                saw_digit = true;
                value = value
                    .checked_mul(10)?
                    .checked_add((c as u8 - b'0') as i64)?;
            }
            _ => return None,
        }
    }
    // Separators alone are not a coordinate.
    saw_digit.then_some(value)
}

/// Register the `UINT` collation on a connection. Must happen before any
/// statement touching the `sequence` column is prepared.
pub fn register_collation(conn: &Connection) -> Result<(), Error> {
    conn.create_collation(COLLATION, |a, b| uint_collate(a, b))
        .map_err(|err| {
            Error::new(ErrorKind::StoreUnavailable)
                .with_message("failed to register UINT collation")
                .with_source(err)
        })
}

/// Numeric-aware name ordering: runs of ASCII digits compare as integers,
/// everything else compares bytewise, so "chr2" sorts before "chr10".
/// Names differing only in leading zeros compare equal.
pub fn uint_collate(a: &str, b: &str) -> Ordering {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let mut i = 0;
    let mut j = 0;
    while i < a.len() && j < b.len() {
        if a[i].is_ascii_digit() && b[j].is_ascii_digit() {
            let sa = i;
            while i < a.len() && a[i].is_ascii_digit() {
                i += 1;
            }
            let sb = j;
            while j < b.len() && b[j].is_ascii_digit() {
                j += 1;
            }
            let ra = trim_leading_zeros(&a[sa..i]);
            let rb = trim_leading_zeros(&b[sb..j]);
            let ord = ra.len().cmp(&rb.len()).then_with(|| ra.cmp(rb));
            if ord != Ordering::Equal {
                return ord;
            }
        } else {
            let ord = a[i].cmp(&b[j]);
            if ord != Ordering::Equal {
                return ord;
            }
            i += 1;
            j += 1;
        }
    }
    (a.len() - i).cmp(&(b.len() - j))
}

fn trim_leading_zeros(run: &[u8]) -> &[u8] {
    let nonzero = run.iter().position(|b| *b != b'0').unwrap_or(run.len());
    &run[nonzero..]
}

/// SQL fragment that builds the range index over the named (sequence,
/// begin, end) columns. Executed by the loader inside the load transaction,
/// before commit.
pub fn create_range_index_sql(
    relation: &str,
    sequence_col: &str,
    begin_col: &str,
    end_col: &str,
) -> String {
    format!("CREATE INDEX {relation}_gri ON {relation}({sequence_col}, {begin_col}, {end_col})")
}

/// SQL subquery resolving a bound range to the rowids of overlapping
/// records. Binds: ?1 = sequence, ?2 = begin, ?3 = end. Overlap is closed
/// interval intersection. `INDEXED BY` pins the range index so a store
/// missing it fails at prepare instead of silently scanning.
pub fn range_rowids_sql(
    relation: &str,
    sequence_col: &str,
    begin_col: &str,
    end_col: &str,
) -> String {
    format!(
        "SELECT _rowid_ FROM {relation} INDEXED BY {relation}_gri \
         WHERE {sequence_col} = ?1 AND {begin_col} <= ?3 AND {end_col} >= ?2"
    )
}
