use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::session::{accept_one, bind, SessionHandle};
use crate::error::ChannelError;
use crate::kernel::channel::ObjectSender;
use crate::kernel::context::RunContext;
use crate::kernel::event::Profile;

const NAME: &str = "data";

/// Longest accepted record, line ending excluded.
pub const MAX_RECORD_BYTES: usize = 64 * 1024;

/// Close handle of the data channel; `close` yields the number of profiles
/// enqueued.
pub type DataHandle = SessionHandle<u64>;

/// Opens the data channel and starts serving its single client.
///
/// Wire format: one JSON value per line. Each line becomes a `Profile` on
/// the object channel, in line order. The first line that is not valid JSON,
/// or is longer than `MAX_RECORD_BYTES`, ends the session; its error is
/// returned by `close`.
pub fn listen_data(ctx: &RunContext, objects: ObjectSender) -> Result<DataHandle, ChannelError> {
    let (listener, guard) = bind(&ctx.data_socket())?;
    info!(path = %guard.path().display(), "data socket opened");

    let stop = CancellationToken::new();
    let token = stop.clone();
    let task = tokio::spawn(serve(listener, token, objects));

    Ok(SessionHandle::new(NAME, task, stop, guard))
}

async fn serve(
    listener: UnixListener,
    stop: CancellationToken,
    objects: ObjectSender,
) -> Result<u64, ChannelError> {
    match accept_one(NAME, listener, &stop).await? {
        Some(stream) => read_profiles(stream, objects).await,
        None => Ok(0),
    }
}

async fn read_profiles(stream: UnixStream, objects: ObjectSender) -> Result<u64, ChannelError> {
    let mut reader = BufReader::new(stream);
    let mut line = Vec::new();
    let mut count = 0u64;

    loop {
        line.clear();
        // Room for the record plus "\r\n"; anything cut off here is too long.
        let limit = (MAX_RECORD_BYTES + 2) as u64;
        if (&mut reader).take(limit).read_until(b'\n', &mut line).await? == 0 {
            info!(profiles = count, "data socket EOF");
            return Ok(count);
        }

        let record = strip_line_ending(&line);
        if record.len() > MAX_RECORD_BYTES {
            return Err(ChannelError::Oversized {
                line: count + 1,
                limit: MAX_RECORD_BYTES,
            });
        }

        let payload = serde_json::from_slice(record).map_err(|source| {
            ChannelError::Malformed {
                line: count + 1,
                source,
            }
        })?;

        objects.send(Box::new(Profile::new(payload))).await?;
        count += 1;
        debug!(profiles = count, "profile enqueued");
    }
}

fn strip_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
