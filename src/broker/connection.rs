use crate::broker::Broker;
use crate::error::CeleryError;
use crate::options::ClientOptions;
use crate::protocol::{read_frame, Command, Reply};
use log::{debug, trace, warn};
use tokio::io::{AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

/// A single persistent connection to the broker.
///
/// The socket is opened lazily on the first command (or eagerly via [`Connection::connect`]) and reused afterwards.
/// Commands are serialized through a mutex since replies are matched to requests purely by order.
///
/// A command that fails partway, or whose future is dropped before its reply has been read, leaves the socket out of
/// step with its replies. The connection is then broken: every later command fails with [`CeleryError::Connection`]
/// until [`Connection::connect`] opens a fresh socket.
///
#[derive(Debug)]
pub struct Connection {
    options: ClientOptions,
    link: Mutex<Link>,
}

#[derive(Debug)]
enum Link {
    /// Never opened.
    Idle,
    Open(BufStream<TcpStream>),
    /// A command was interrupted or failed mid-reply.
    Broken,
}

impl Connection {
    pub fn new(options: ClientOptions) -> Self {
        Self { options, link: Mutex::new(Link::Idle) }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Open the socket now instead of on the first command.
    ///
    /// Does nothing when the socket is already open and healthy. A broken connection is replaced with a new socket,
    /// which is the only way to recover from one.
    ///
    pub async fn connect(&self) -> Result<(), CeleryError> {
        let mut link = self.link.lock().await;
        if !matches!(*link, Link::Open(_)) {
            *link = Link::Open(self.open().await?);
        }
        Ok(())
    }

    /// Whether the socket is open and in step with its replies.
    pub async fn is_connected(&self) -> bool {
        matches!(*self.link.lock().await, Link::Open(_))
    }

    async fn open(&self) -> Result<BufStream<TcpStream>, CeleryError> {
        let address = self.options.address();
        debug!(address; "Connecting to broker");

        let connecting = TcpStream::connect(&address);
        let tcp = match self.options.connect_timeout {
            Some(timeout) => tokio::time::timeout(timeout, connecting).await.map_err(|_| CeleryError::Connection {
                message: format!("timed out connecting to {address}"),
                source: None,
            })?,
            None => connecting.await,
        }
        .map_err(|e| CeleryError::connection(format!("failed to connect to {address}"), e))?;

        let mut stream = BufStream::new(tcp);
        if let Some(password) = &self.options.password {
            round_trip(&mut stream, &Command::auth(password)).await?.map_err(CeleryError::Protocol)?;
        }
        round_trip(&mut stream, &Command::select(self.options.db)).await?.map_err(CeleryError::Protocol)?;

        debug!(address, db = self.options.db; "Connected to broker");
        Ok(stream)
    }
}

impl Broker for Connection {
    async fn execute_command(&self, command: Command) -> Result<Reply, CeleryError> {
        let mut link = self.link.lock().await;
        if let Link::Idle = *link {
            *link = Link::Open(self.open().await?);
        }

        // The stream is only put back once a whole reply has been read. If this future is dropped mid-command, the
        // link stays broken.
        let Link::Open(mut stream) = std::mem::replace(&mut *link, Link::Broken) else {
            return Err(CeleryError::Connection {
                message: "connection is broken, reconnect before sending more commands".to_owned(),
                source: None,
            });
        };

        match round_trip(&mut stream, &command).await {
            Ok(reply) => {
                *link = Link::Open(stream);
                reply.map_err(CeleryError::Protocol)
            }
            Err(e) => {
                warn!(command = command.name(), error:% = e; "Broker connection broken");
                Err(e)
            }
        }
    }
}

/// Send one command and read its reply. The inner error is a complete server error reply.
async fn round_trip(
    stream: &mut BufStream<TcpStream>,
    command: &Command,
) -> Result<Result<Reply, String>, CeleryError> {
    trace!(command:?; "Executing command");
    stream
        .write_all(&command.encode())
        .await
        .map_err(|e| CeleryError::connection("failed writing command", e))?;
    stream.flush().await.map_err(|e| CeleryError::connection("failed writing command", e))?;

    read_frame(stream).await
}
