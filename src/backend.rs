use std::sync::Arc;

use anyhow::Context as _;

use crate::api::Library;
use crate::config::BackendConfig;
use crate::session::SessionContext;
use crate::store::memory::{MemoryAuth, MemoryStore};
use crate::store::rest::{RestAuth, RestStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Backend {
    /// Seeded in-process store; nothing survives the process.
    Memory,
    /// Hosted backend configured through `VIDELINA_*` variables.
    Rest,
}

pub struct Connection {
    pub library: Library,
    pub session: Arc<SessionContext>,
}

pub async fn connect(backend: Backend) -> anyhow::Result<Connection> {
    match backend {
        Backend::Memory => {
            let store = Arc::new(MemoryStore::seeded().await.context("seed memory store")?);
            tracing::info!("using in-memory backend");
            Ok(Connection {
                library: Library::new(store.clone(), store),
                session: Arc::new(SessionContext::new(Arc::new(MemoryAuth::new()))),
            })
        }
        Backend::Rest => {
            let config = BackendConfig::from_env()?;
            connect_rest(config)
        }
    }
}

pub fn connect_rest(config: BackendConfig) -> anyhow::Result<Connection> {
    tracing::info!(
        url = %config.base_url,
        bucket = %config.bucket,
        timeout_secs = config.timeout.as_secs(),
        "using hosted backend"
    );
    let session = Arc::new(SessionContext::new(Arc::new(
        RestAuth::new(config.clone()).context("build auth client")?,
    )));
    let store = Arc::new(
        RestStore::new(config.clone())
            .context("build store client")?
            .with_session(session.subscribe()),
    );
    Ok(Connection {
        library: Library::new(store.clone(), store).with_bucket(config.bucket),
        session,
    })
}
