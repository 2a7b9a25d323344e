//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::governance::LmdbGovernanceStore;
use crate::migration::Migrator;
use crate::LmdbError;

/// Number of named databases the governance schema uses.
pub const MAX_DBS: u32 = 6;

/// Default memory map size: 1 GiB.
pub const DEFAULT_MAP_SIZE: usize = 1 << 30;

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    pub(crate) applications_db: Database<Bytes, Bytes>,
    pub(crate) history_db: Database<Bytes, Bytes>,
    pub(crate) rounds_db: Database<Bytes, Bytes>,
    pub(crate) deposits_db: Database<Bytes, Bytes>,
    pub(crate) messages_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path, creating the
    /// directory and every database on first use.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;
        // SAFETY: the environment is opened once per process for this path
        // and never mapped by another handle in the same process.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let applications_db = env.create_database(&mut wtxn, Some("applications"))?;
        let history_db = env.create_database(&mut wtxn, Some("application_history"))?;
        let rounds_db = env.create_database(&mut wtxn, Some("rounds"))?;
        let deposits_db = env.create_database(&mut wtxn, Some("deposits"))?;
        let messages_db = env.create_database(&mut wtxn, Some("messages"))?;
        let meta_db = env.create_database(&mut wtxn, Some("meta"))?;
        wtxn.commit()?;

        let environment = Self {
            env: Arc::new(env),
            applications_db,
            history_db,
            rounds_db,
            deposits_db,
            messages_db,
            meta_db,
        };
        Migrator::run(&environment)?;
        tracing::info!(path = %path.display(), map_size, "LMDB environment opened");
        Ok(environment)
    }

    pub(crate) fn env(&self) -> &Env {
        &self.env
    }

    /// A governance store over this environment's databases.
    pub fn governance_store(&self) -> LmdbGovernanceStore {
        LmdbGovernanceStore {
            env: self.env.clone(),
            applications_db: self.applications_db,
            history_db: self.history_db,
            rounds_db: self.rounds_db,
            deposits_db: self.deposits_db,
            messages_db: self.messages_db,
            meta_db: self.meta_db,
        }
    }
}
