use crate::Result;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashSet;
use tracing::debug;

/// Keyed persistence of reference fingerprints, one set per repository.
///
/// Key schema: `"{owner}:{repo}"`. A missing key reads as the empty set;
/// a write replaces the stored set wholesale (no merge semantics).
#[derive(Clone)]
pub struct BaselineStore {
    con: ConnectionManager,
}

impl BaselineStore {
    /// Connect to the broker at `url`.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let con = ConnectionManager::new(client).await?;
        Ok(Self::new(con))
    }

    /// Wrap an existing managed connection.
    pub fn new(con: ConnectionManager) -> Self {
        Self { con }
    }

    fn key(owner: &str, repo: &str) -> String {
        format!("{owner}:{repo}")
    }

    /// Read the stored fingerprint set; empty if the key is absent.
    pub async fn read(&self, owner: &str, repo: &str) -> Result<HashSet<String>> {
        let key = Self::key(owner, repo);
        let mut con = self.con.clone();
        let members: Vec<String> = con.smembers(&key).await?;
        debug!(%key, count = members.len(), "read baseline");
        Ok(members.into_iter().collect())
    }

    /// Replace the stored set. DEL + SADD run in one atomic pipeline so
    /// readers never observe a half-written baseline.
    pub async fn write(&self, owner: &str, repo: &str, fingerprints: &HashSet<String>) -> Result<()> {
        let key = Self::key(owner, repo);
        let mut con = self.con.clone();

        let mut pipe = redis::pipe();
        pipe.atomic().del(&key).ignore();
        if !fingerprints.is_empty() {
            let members: Vec<&String> = fingerprints.iter().collect();
            pipe.sadd(&key, members).ignore();
        }
        pipe.query_async::<_, ()>(&mut con).await?;

        debug!(%key, count = fingerprints.len(), "wrote baseline");
        Ok(())
    }
}
