use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::session::{accept_one, bind, SessionHandle};
use crate::error::ChannelError;
use crate::kernel::context::RunContext;

const NAME: &str = "logs";

/// Close handle of the log channel; `close` yields the number of bytes
/// copied.
pub type LogHandle = SessionHandle<u64>;

/// Opens the log channel. Every byte from its single client is copied
/// verbatim into `sink` until the client hangs up.
pub fn listen_log<W>(ctx: &RunContext, sink: W) -> Result<LogHandle, ChannelError>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (listener, guard) = bind(&ctx.log_socket())?;
    info!(path = %guard.path().display(), "logs socket opened");

    let stop = CancellationToken::new();
    let token = stop.clone();
    let task = tokio::spawn(serve(listener, token, sink));

    Ok(SessionHandle::new(NAME, task, stop, guard))
}

async fn serve<W>(listener: UnixListener, stop: CancellationToken, mut sink: W) -> Result<u64, ChannelError>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let Some(mut stream) = accept_one(NAME, listener, &stop).await? else {
        return Ok(0);
    };

    let copied = tokio::io::copy(&mut stream, &mut sink).await?;
    sink.flush().await?;
    info!(bytes = copied, "logs socket EOF");
    Ok(copied)
}
