//! Database handle.

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::http::{HttpClient, HttpTransport};
use crate::reference::Reference;
use crate::transaction::{Snapshot, Transaction, TransactionRunner, TransactionStats};
use crate::transport::{StoreTransport, WriteOp, WriteOutcome};
use canopy_protocol::{Precondition, Value, VersionToken};
use parking_lot::RwLock;
use tracing::debug;

/// A connection to one store.
///
/// Plain reads and writes are unconditional. Use
/// [`run_transaction`](Self::run_transaction) to write based on what was read.
///
/// # Example
///
/// ```
/// use canopy_client::{ClientConfig, Database, LoopbackClient};
/// use canopy_protocol::Request;
/// use canopy_server::StoreServer;
///
/// let server = StoreServer::default();
/// let store = server.clone();
/// let db = Database::connect(
///     ClientConfig::new("https://db.test"),
///     LoopbackClient::new(move |request: &Request| store.handle(request)),
/// );
///
/// let counter = db.reference("/counter").unwrap();
/// db.set(&counter, 5).unwrap();
///
/// db.run_transaction(|tx| {
///     let current = tx.snapshot(&counter)?.value().as_i64().unwrap_or(0);
///     tx.set(&counter, current + 1)
/// })
/// .unwrap();
///
/// assert_eq!(db.get_value(&counter).unwrap(), serde_json::json!(6));
/// ```
pub struct Database<T: StoreTransport> {
    config: ClientConfig,
    transport: T,
    stats: RwLock<TransactionStats>,
}

impl<C: HttpClient> Database<HttpTransport<C>> {
    /// Connects to the store at `config.base_url` through `client`.
    pub fn connect(config: ClientConfig, client: C) -> Self {
        let transport = HttpTransport::from_config(&config, client);
        Self::new(config, transport)
    }
}

impl<T: StoreTransport> Database<T> {
    /// Creates a database over an existing transport.
    pub fn new(config: ClientConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            stats: RwLock::new(TransactionStats::default()),
        }
    }

    /// Reference to the node at `path`.
    pub fn reference(&self, path: &str) -> ClientResult<Reference> {
        Reference::new(path)
    }

    /// Reference to the root node.
    pub fn root(&self) -> Reference {
        Reference::root()
    }

    /// Reads a node's current value.
    pub fn get_value(&self, reference: &Reference) -> ClientResult<Value> {
        Ok(self.transport.read_node(reference.path())?.value)
    }

    /// Reads a node's current value and version.
    pub fn snapshot(&self, reference: &Reference) -> ClientResult<Snapshot> {
        let read = self.transport.read_node(reference.path())?;
        Ok(Snapshot::new(reference.clone(), read.value, read.version))
    }

    /// Unconditionally replaces a node's value, returning its new version.
    pub fn set(&self, reference: &Reference, value: impl Into<Value>) -> ClientResult<VersionToken> {
        self.write(reference, WriteOp::Set(value.into()))
    }

    /// Unconditionally deletes a node.
    pub fn remove(&self, reference: &Reference) -> ClientResult<VersionToken> {
        self.write(reference, WriteOp::Remove)
    }

    /// Runs `callback` once as a transaction.
    ///
    /// The first conflict the callback does not handle is returned as
    /// [`ClientError::TransactionFailed`]; it is not retried.
    pub fn run_transaction<R, F>(&self, callback: F) -> ClientResult<R>
    where
        F: FnOnce(&mut Transaction<'_, T>) -> ClientResult<R>,
    {
        self.runner().run(callback)
    }

    /// Runs `callback` as a transaction, starting over after a conflict as
    /// allowed by `config.retry`.
    pub fn run_transaction_with_retry<R, F>(&self, callback: F) -> ClientResult<R>
    where
        F: FnMut(&mut Transaction<'_, T>) -> ClientResult<R>,
    {
        self.runner().run_with_retry(callback)
    }

    /// Gets the transaction statistics.
    pub fn stats(&self) -> TransactionStats {
        self.stats.read().clone()
    }

    /// Gets the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Gets the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Closes the underlying transport.
    pub fn close(&self) -> ClientResult<()> {
        self.transport.close()
    }

    fn runner(&self) -> TransactionRunner<'_, T> {
        TransactionRunner::new(&self.transport)
            .with_retry(self.config.retry.clone())
            .with_stats(&self.stats)
    }

    fn write(&self, reference: &Reference, op: WriteOp) -> ClientResult<VersionToken> {
        match self
            .transport
            .write_node(reference.path(), &op, &Precondition::Any)?
        {
            WriteOutcome::Applied(version) => {
                debug!(path = %reference, op = op.name(), version = %version, "write applied");
                Ok(version)
            }
            // Unconditional writes carry no precondition to fail.
            WriteOutcome::Conflict(conflict) => Err(ClientError::Server {
                status: conflict.response.status,
                message: conflict.response.error_message(),
            }),
        }
    }
}
