//! Destroy lifecycle hooks.
//!
//! Both hooks default to no-ops, so a record type only implements the
//! ones it needs. Hooks run inside the destroy transaction; an error
//! from either hook aborts and rolls back the whole destroy.

use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Error raised from inside a destroy hook.
#[derive(Debug)]
pub enum HookError {
    /// The hook refused the operation.
    Aborted(String),
    /// A database call inside the hook failed.
    Db(rusqlite::Error),
}

impl HookError {
    /// Builds an abort error with the given reason.
    pub fn aborted(reason: impl Into<String>) -> Self {
        Self::Aborted(reason.into())
    }
}

impl Display for HookError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Aborted(reason) => write!(f, "destroy hook aborted: {reason}"),
            Self::Db(err) => write!(f, "destroy hook database failure: {err}"),
        }
    }
}

impl Error for HookError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Aborted(_) => None,
            Self::Db(err) => Some(err),
        }
    }
}

impl From<rusqlite::Error> for HookError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(value)
    }
}

/// Before/after hooks around the destroy entry point.
///
/// The connection handed to a hook participates in the destroy
/// transaction, so hook queries see uncommitted destroy state.
pub trait DestroyHooks<E> {
    fn before_destroy(&self, _record: &mut E, _conn: &Connection) -> Result<(), HookError> {
        Ok(())
    }

    fn after_destroy(&self, _record: &mut E, _conn: &Connection) -> Result<(), HookError> {
        Ok(())
    }
}

/// Hook set with no behavior, used when a type defines no hooks.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl<E> DestroyHooks<E> for NoHooks {}
