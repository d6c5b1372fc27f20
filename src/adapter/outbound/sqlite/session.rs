//! Re-entrant transactional scopes over the SQLite pool.
//!
//! The first scope entered checks out a connection and begins a transaction.
//! Scopes entered while it is open reuse that transaction and only bump the
//! nesting depth. When the outermost scope exits, the transaction is
//! committed (write scope), discarded (read-only scope) or rolled back
//! (error), and the connection goes back to the pool.

use std::cell::RefCell;

use diesel::connection::{AnsiTransactionManager, TransactionManager};
use diesel::{QueryResult, SqliteConnection};
use parking_lot::ReentrantMutex;
use tracing::{debug, warn};

use super::database::connection::{DbConnection, DbPool};
use crate::error::{Error, Result};

#[derive(Default)]
struct ScopeState {
    conn: Option<DbConnection>,
    read_only: bool,
    depth: usize,
}

/// Owner of the active session.
///
/// Nested scopes re-enter on the owning thread; scopes opened from other
/// threads wait until the outermost scope has exited.
pub struct SessionProvider {
    pool: DbPool,
    state: ReentrantMutex<RefCell<ScopeState>>,
}

impl SessionProvider {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            state: ReentrantMutex::new(RefCell::new(ScopeState::default())),
        }
    }

    #[must_use]
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Handle for a scope. The read-only flag only takes effect when the
    /// handle opens the outermost scope.
    #[must_use]
    pub fn session(&self, read_only: bool) -> SessionScope<'_> {
        SessionScope {
            provider: self,
            read_only,
        }
    }

    /// Current nesting depth; `0` when idle.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.state.lock().borrow().depth
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.depth() > 0
    }

    /// Run `f` against the already-open session without entering a new scope.
    ///
    /// # Errors
    /// Returns [`Error::SessionNotProvided`] when no scope is open, or the
    /// error returned by `f`.
    pub fn with_current<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Session<'_>) -> Result<T>,
    {
        let guard = self.state.lock();
        if guard.borrow().depth == 0 {
            return Err(Error::SessionNotProvided);
        }
        f(&Session { state: &guard })
    }

    fn enter(&self, state: &RefCell<ScopeState>, read_only: bool) -> Result<()> {
        let mut state = state.borrow_mut();
        if state.depth == 0 {
            let mut conn = self.pool.get()?;
            let raw: &mut SqliteConnection = &mut conn;
            AnsiTransactionManager::begin_transaction(raw)?;
            state.conn = Some(conn);
            state.read_only = read_only;
            debug!(read_only, "session opened");
        }
        state.depth += 1;
        Ok(())
    }

    fn exit<T>(&self, state: &RefCell<ScopeState>, result: Result<T>) -> Result<T> {
        let mut state = state.borrow_mut();
        state.depth = state.depth.saturating_sub(1);
        if state.depth > 0 {
            return result;
        }

        let read_only = state.read_only;
        let Some(mut conn) = state.conn.take() else {
            return result;
        };
        let raw: &mut SqliteConnection = &mut conn;

        match result {
            Err(err) => {
                warn!(error = %err, "session failed, rolling back");
                rollback(raw);
                Err(err)
            }
            Ok(value) if read_only => {
                rollback(raw);
                debug!("read-only session closed");
                Ok(value)
            }
            Ok(value) => match AnsiTransactionManager::commit_transaction(raw) {
                Ok(()) => {
                    debug!("session committed");
                    Ok(value)
                }
                Err(err) => {
                    warn!(error = %err, "commit failed, rolling back");
                    rollback(raw);
                    Err(err.into())
                }
            },
        }
    }

    fn unwind(&self, state: &RefCell<ScopeState>) {
        let Ok(mut state) = state.try_borrow_mut() else {
            return;
        };
        state.depth = state.depth.saturating_sub(1);
        if state.depth == 0 {
            if let Some(mut conn) = state.conn.take() {
                warn!("session abandoned, rolling back");
                rollback(&mut conn);
            }
        }
    }
}

fn rollback(conn: &mut SqliteConnection) {
    // Diesel may already have rolled back after a failed commit.
    if let Err(err) = AnsiTransactionManager::rollback_transaction(conn) {
        debug!(error = %err, "rollback skipped");
    }
}

/// Scope handle returned by [`SessionProvider::session`].
pub struct SessionScope<'p> {
    provider: &'p SessionProvider,
    read_only: bool,
}

impl SessionScope<'_> {
    /// Enter the scope, run `f` with the active session, then exit.
    ///
    /// # Errors
    /// Returns the error of `f` after rollback, a commit failure after
    /// rollback, or a pool error if no connection could be checked out.
    pub fn run<T, F>(self, f: F) -> Result<T>
    where
        F: FnOnce(&Session<'_>) -> Result<T>,
    {
        let guard = self.provider.state.lock();
        self.provider.enter(&guard, self.read_only)?;

        let mut unwind = UnwindGuard {
            provider: self.provider,
            state: &guard,
            armed: true,
        };
        let result = f(&Session { state: &guard });
        unwind.armed = false;

        self.provider.exit(&guard, result)
    }
}

/// Releases the scope if `f` panics.
struct UnwindGuard<'a> {
    provider: &'a SessionProvider,
    state: &'a RefCell<ScopeState>,
    armed: bool,
}

impl Drop for UnwindGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.provider.unwind(self.state);
        }
    }
}

/// The active session, valid for the duration of one scope.
pub struct Session<'a> {
    state: &'a RefCell<ScopeState>,
}

impl Session<'_> {
    /// Read-only flag fixed by the outermost scope.
    #[must_use]
    pub fn read_only(&self) -> bool {
        self.state.borrow().read_only
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.state.borrow().depth
    }

    /// Run a query on the session's connection.
    ///
    /// `f` must not open scopes of its own.
    ///
    /// # Errors
    /// Returns [`Error::SessionNotProvided`] if the session is closed, or
    /// the converted query error.
    pub fn execute<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> QueryResult<T>,
    {
        let mut state = self.state.borrow_mut();
        let conn = state.conn.as_mut().ok_or(Error::SessionNotProvided)?;
        Ok(f(conn)?)
    }
}
