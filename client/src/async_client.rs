use crate::{Client, Connector, Error, TcpConnector};
use async_executor::LocalExecutor;
use sorrel_http::{Request, Response};
use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::JoinHandle,
};

type ResponseCallback = Box<dyn FnOnce(&mut Request, &mut Response) + Send>;
type ConnectCallback = Box<dyn FnOnce(&Request) + Send>;
type ErrorCallback = Box<dyn FnOnce(&mut Request, Error) + Send>;

struct Job {
    request: Request,
    on_response: ResponseCallback,
    on_connect: ConnectCallback,
    on_error: ErrorCallback,
}

/// A [`Client`] driven by a background worker thread.
///
/// [`async_query`][AsyncClient::async_query] hands a request to the
/// worker and returns immediately. The worker connects to all
/// outstanding targets concurrently; each query cycle itself then runs
/// synchronously on the worker, and the request's callbacks fire from
/// that thread in the order connect → (response | error). Callbacks of
/// different requests may interleave.
///
/// Stopping (or dropping) the client drops requests that have not begun
/// without firing their callbacks; a callback already running completes
/// first.
pub struct AsyncClient<C: Connector = TcpConnector> {
    client: Arc<Client<C>>,
    sender: Option<async_channel::Sender<Job>>,
    worker: Option<JoinHandle<()>>,
    stopping: Arc<AtomicBool>,
}

impl<C: Connector> AsyncClient<C> {
    /// Wraps a client; call [`start`][AsyncClient::start] before
    /// queueing queries.
    pub fn new(client: Client<C>) -> Self {
        Self {
            client: Arc::new(client),
            sender: None,
            worker: None,
            stopping: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether the worker thread is running.
    pub fn started(&self) -> bool {
        self.worker.is_some()
    }

    /// Launches the worker thread. Does nothing when already started.
    ///
    /// # Errors
    ///
    /// The OS error when the thread cannot be spawned.
    pub fn start(&mut self) -> io::Result<()> {
        if self.started() {
            return Ok(());
        }
        self.stopping.store(false, Ordering::SeqCst);
        let (sender, receiver) = async_channel::unbounded::<Job>();
        let client = self.client.clone();
        let stopping = self.stopping.clone();
        let worker = std::thread::Builder::new()
            .name("sorrel-async-client".to_string())
            .spawn(move || Self::run(&client, &receiver, &stopping))?;
        self.sender = Some(sender);
        self.worker = Some(worker);
        Ok(())
    }

    /// Signals the worker and joins it. Requests that have not started
    /// are dropped without callbacks.
    pub fn stop(&mut self) {
        self.stopping.store(true, Ordering::SeqCst);
        self.sender = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("async client worker panicked");
            }
        }
    }

    /// Queues a query. `on_connect` fires once the connection is
    /// established, then exactly one of `on_response` or `on_error`.
    ///
    /// A query queued while the client is not started is dropped with a
    /// warning.
    pub fn async_query(
        &self,
        request: Request,
        on_response: impl FnOnce(&mut Request, &mut Response) + Send + 'static,
        on_connect: impl FnOnce(&Request) + Send + 'static,
        on_error: impl FnOnce(&mut Request, Error) + Send + 'static,
    ) {
        let job = Job {
            request,
            on_response: Box::new(on_response),
            on_connect: Box::new(on_connect),
            on_error: Box::new(on_error),
        };
        match &self.sender {
            Some(sender) => {
                if sender.send_blocking(job).is_err() {
                    log::warn!("async query dropped: worker is stopping");
                }
            }
            None => log::warn!("async query dropped: client not started"),
        }
    }

    fn run(
        client: &Arc<Client<C>>,
        receiver: &async_channel::Receiver<Job>,
        stopping: &AtomicBool,
    ) {
        let executor = LocalExecutor::new();
        async_io::block_on(executor.run(async {
            loop {
                let Ok(job) = receiver.recv().await else {
                    break;
                };
                // a queued job observed after stop() is cancelled: drop
                // it without firing any of its callbacks, and keep
                // draining so none of the backlog runs either
                if stopping.load(Ordering::SeqCst) {
                    drop(job);
                    continue;
                }
                executor.spawn(Self::handle(client.clone(), job)).detach();
            }
        }));
    }

    async fn handle(client: Arc<Client<C>>, job: Job) {
        let Job {
            mut request,
            on_response,
            on_connect,
            on_error,
        } = job;

        // connects race each other on the executor; the query cycle
        // itself is synchronous on this thread
        match client.connect_async(&request.url).await {
            Ok(connection) => {
                request.connection = Some(connection);
                on_connect(&request);
                match client.get_response(&mut request) {
                    Ok(mut response) => on_response(&mut request, &mut response),
                    Err(error) => on_error(&mut request, error),
                }
                if let Some(connection) = request.connection.take() {
                    connection.close();
                }
            }
            Err(error) => on_error(&mut request, error),
        }
    }
}

impl<C: Connector> Drop for AsyncClient<C> {
    fn drop(&mut self) {
        self.stop();
    }
}
