use crate::error::CeleryError;
use futures::future::BoxFuture;
use futures::FutureExt;
use log::trace;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// One decoded reply from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `+` status line, e.g. `OK`.
    Status(String),

    /// `:` integer, kept as its literal digits since it may exceed native integer ranges.
    Integer(String),

    /// `$` bulk string.
    Bulk(Vec<u8>),

    /// `*` array of nested replies.
    Array(Vec<Reply>),

    /// `$-1` or `*-1`.
    Nil,
}

impl Reply {
    pub fn is_status(&self) -> bool {
        matches!(self, Reply::Status(_))
    }

    /// Whether this reply acknowledges a write. Statuses and non-zero integers do.
    pub fn is_ack(&self) -> bool {
        match self {
            Reply::Status(_) => true,
            Reply::Integer(digits) => digits != "0",
            _ => false,
        }
    }

    /// Bytes of a bulk reply, `None` for nil.
    pub fn into_bulk(self) -> Result<Option<Vec<u8>>, CeleryError> {
        match self {
            Reply::Bulk(bytes) => Ok(Some(bytes)),
            Reply::Nil => Ok(None),
            other => Err(CeleryError::Protocol(format!("expected bulk reply, got {other:?}"))),
        }
    }
}

/// Largest bulk string accepted, matching the store's own limit.
pub const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// Upper bound on how many array slots are reserved up front, whatever count the header claims.
const ARRAY_PREALLOC: usize = 64;

/// Read exactly one reply from the stream.
///
/// Arrays are decoded recursively, so a single call consumes the whole array including nested replies.
/// An error reply (`-`) is returned as [`CeleryError::Protocol`] carrying the server message.
///
pub async fn read_reply<R>(reader: &mut R) -> Result<Reply, CeleryError>
where
    R: AsyncBufRead + Unpin + Send,
{
    read_frame(reader).await?.map_err(CeleryError::Protocol)
}

/// Read exactly one reply, keeping server error replies apart from stream failures.
///
/// The outer error means the stream can't be trusted any more: an IO failure or a malformed reply left unread bytes
/// behind. The inner error is a server error reply (`-`, possibly nested in an array) that was consumed completely, so
/// the stream is still in step.
///
pub(crate) async fn read_frame<R>(reader: &mut R) -> Result<Result<Reply, String>, CeleryError>
where
    R: AsyncBufRead + Unpin + Send,
{
    let mut server_error = None;
    let reply = decode(reader, &mut server_error).await?;
    Ok(match server_error {
        Some(message) => Err(message),
        None => Ok(reply),
    })
}

/// Decode one reply. The first error reply met is stored in `server_error` and decoding carries on, so the stream is
/// left at the start of the next reply.
fn decode<'a, R>(reader: &'a mut R, server_error: &'a mut Option<String>) -> BoxFuture<'a, Result<Reply, CeleryError>>
where
    R: AsyncBufRead + Unpin + Send,
{
    async move {
        let line = read_line(&mut *reader).await?;
        let (kind, rest) = match line.split_first() {
            Some((kind, rest)) => (*kind, String::from_utf8_lossy(rest).into_owned()),
            None => return Err(CeleryError::Protocol("unable to parse reply: empty line".to_owned())),
        };

        let reply = match kind {
            b'+' => Reply::Status(rest),
            b'-' => {
                server_error.get_or_insert(rest);
                Reply::Nil
            }
            b':' => Reply::Integer(rest),
            b'$' => match parse_length(&rest)? {
                None => Reply::Nil,
                Some(len) if len > MAX_BULK_LEN => {
                    return Err(CeleryError::Protocol(format!("bulk reply of {len} bytes exceeds the limit")))
                }
                Some(len) => {
                    let mut data = vec![0u8; len + 2];
                    reader
                        .read_exact(&mut data)
                        .await
                        .map_err(|e| CeleryError::connection("failed reading bulk reply", e))?;
                    data.truncate(len);
                    Reply::Bulk(data)
                }
            },
            b'*' => match parse_length(&rest)? {
                None => Reply::Nil,
                Some(count) => {
                    let mut items = Vec::with_capacity(count.min(ARRAY_PREALLOC));
                    for _ in 0..count {
                        items.push(decode(&mut *reader, &mut *server_error).await?);
                    }
                    Reply::Array(items)
                }
            },
            other => {
                return Err(CeleryError::Protocol(format!(
                    "unable to parse reply starting with {:?}",
                    other as char
                )))
            }
        };

        trace!(reply:?; "Decoded reply");
        Ok(reply)
    }
    .boxed()
}

/// Read one `\r\n`-terminated line, without the terminator.
async fn read_line<R>(reader: &mut R) -> Result<Vec<u8>, CeleryError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let n = reader
        .read_until(b'\n', &mut line)
        .await
        .map_err(|e| CeleryError::connection("failed reading reply", e))?;
    if n == 0 {
        return Err(CeleryError::Connection { message: "connection closed by broker".to_owned(), source: None });
    }
    if line.ends_with(b"\r\n") {
        line.truncate(line.len() - 2);
    } else {
        return Err(CeleryError::Protocol("unterminated reply line".to_owned()));
    }
    Ok(line)
}

/// Parse a length header; negative means nil.
fn parse_length(digits: &str) -> Result<Option<usize>, CeleryError> {
    let len: i64 = digits
        .parse()
        .map_err(|_| CeleryError::Protocol(format!("invalid length {digits:?}")))?;
    Ok(usize::try_from(len).ok())
}
