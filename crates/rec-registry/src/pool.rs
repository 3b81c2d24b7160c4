//! Same fixed-size checkout/return-on-drop pool as `rec-store`, trimmed from
//! the teacher's `arw-kernel::PoolShared`. Kept as a private copy rather
//! than a shared dependency: the registry and event stores are separate
//! document stores with independent lifecycles (spec §1).

use anyhow::{anyhow, Result};
use rusqlite::Connection;
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::sync::{Arc, Condvar, Mutex};

struct PoolState {
    conns: Vec<Connection>,
}

pub(crate) struct PoolShared {
    state: Mutex<PoolState>,
    cvar: Condvar,
}

impl PoolShared {
    fn checkout(self: &Arc<Self>) -> Result<ManagedConnection> {
        let mut guard = self.state.lock().expect("pool mutex poisoned");
        while guard.conns.is_empty() {
            guard = self.cvar.wait(guard).expect("pool condvar wait poisoned");
        }
        let conn = guard.conns.pop().expect("checked non-empty above");
        Ok(ManagedConnection {
            conn: Some(conn),
            pool: Some(self.clone()),
        })
    }

    fn release(&self, conn: Connection) {
        let mut guard = self.state.lock().expect("pool mutex poisoned");
        guard.conns.push(conn);
        self.cvar.notify_one();
    }
}

pub(crate) struct ManagedConnection {
    conn: Option<Connection>,
    pool: Option<Arc<PoolShared>>,
}

impl Deref for ManagedConnection {
    type Target = Connection;
    fn deref(&self) -> &Connection {
        self.conn.as_ref().expect("connection already released")
    }
}

impl DerefMut for ManagedConnection {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().expect("connection already released")
    }
}

impl Drop for ManagedConnection {
    fn drop(&mut self) {
        if let (Some(conn), Some(pool)) = (self.conn.take(), self.pool.take()) {
            pool.release(conn);
        }
    }
}

fn open_connection(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path).map_err(|e| anyhow!("open sqlite db {path:?}: {e}"))?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.busy_timeout(std::time::Duration::from_millis(5_000))?;
    Ok(conn)
}

#[derive(Clone)]
pub(crate) struct Pool {
    inner: Arc<PoolShared>,
}

impl Pool {
    pub(crate) fn open(path: &Path, min_size: usize) -> Result<Self> {
        let mut conns = Vec::with_capacity(min_size.max(1));
        for _ in 0..min_size.max(1) {
            conns.push(open_connection(path)?);
        }
        Ok(Pool {
            inner: Arc::new(PoolShared {
                state: Mutex::new(PoolState { conns }),
                cvar: Condvar::new(),
            }),
        })
    }

    pub(crate) fn get(&self) -> Result<ManagedConnection> {
        self.inner.checkout()
    }
}
