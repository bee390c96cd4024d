use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;

/// One kind per failing stage so a diagnostic always names where the
/// operation died and the exit code stays stable across releases.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Internal,
    Usage,
    SourceUnreadable,
    MalformedRecord,
    StoreUnavailable,
    RelationCreateFailed,
    StatementPrepareFailed,
    InsertFailed,
    IndexBuildFailed,
    CommitFailed,
    QueryPrepareFailed,
    RangeExpressionInvalid,
    QueryStepFailed,
}

impl ErrorKind {
    fn stage(self) -> &'static str {
        match self {
            ErrorKind::Internal => "internal",
            ErrorKind::Usage => "usage",
            ErrorKind::SourceUnreadable => "source unreadable",
            ErrorKind::MalformedRecord => "malformed record",
            ErrorKind::StoreUnavailable => "store unavailable",
            ErrorKind::RelationCreateFailed => "relation create failed",
            ErrorKind::StatementPrepareFailed => "statement prepare failed",
            ErrorKind::InsertFailed => "insert failed",
            ErrorKind::IndexBuildFailed => "index build failed",
            ErrorKind::CommitFailed => "commit failed",
            ErrorKind::QueryPrepareFailed => "query prepare failed",
            ErrorKind::RangeExpressionInvalid => "invalid range expression",
            ErrorKind::QueryStepFailed => "query step failed",
        }
    }
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    path: Option<PathBuf>,
    line: Option<u64>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            path: None,
            line: None,
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn line(&self) -> Option<u64> {
        self.line
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_line(mut self, line: u64) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind.stage())?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path.display())?;
        }
        if let Some(line) = self.line {
            write!(f, " (line: {line})")?;
        }
        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

pub fn to_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::Usage => 2,
        ErrorKind::SourceUnreadable => 3,
        ErrorKind::MalformedRecord => 4,
        ErrorKind::StoreUnavailable => 5,
        ErrorKind::RelationCreateFailed => 6,
        ErrorKind::StatementPrepareFailed => 7,
        ErrorKind::InsertFailed => 8,
        ErrorKind::IndexBuildFailed => 9,
        ErrorKind::CommitFailed => 10,
        ErrorKind::QueryPrepareFailed => 11,
        ErrorKind::RangeExpressionInvalid => 12,
        ErrorKind::QueryStepFailed => 13,
    }
}
