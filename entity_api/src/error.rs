//! Error types for entity API
use std::error::Error as StdError;
use std::fmt;

use serde::Serialize;

use sea_orm::error::DbErr;

/// Errors while reading entities.
/// The intent is to categorize errors into two major types:
///  * Errors related to data. Ex DbErr::RecordNotFound
///  * Errors related to interactions with the database itself. Ex DbErr::Conn
#[derive(Debug, PartialEq)]
pub struct Error {
    // Underlying error emitted from seaORM internals
    pub source: Option<DbErr>,
    // Enum representing which category of error
    pub error_kind: EntityApiErrorKind,
}

#[derive(Debug, PartialEq, Serialize)]
pub enum EntityApiErrorKind {
    // Record not found
    RecordNotFound,
    // Errors related to interactions with the database itself. Ex DbErr::Conn
    SystemError,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "Entity API Error ({:?}): {source}", self.error_kind),
            None => write!(f, "Entity API Error ({:?})", self.error_kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn StdError + 'static))
    }
}

impl From<DbErr> for Error {
    fn from(err: DbErr) -> Self {
        let error_kind = match err {
            DbErr::RecordNotFound(_) => EntityApiErrorKind::RecordNotFound,
            _ => EntityApiErrorKind::SystemError,
        };
        Error {
            source: Some(err),
            error_kind,
        }
    }
}
