//! The transparent codec: copies HTTP/2 body frames byte-for-byte between
//! two streams without ever interpreting them as a gRPC/Thrift message.
//!
//! There is no `Encoder`/`Decoder` trait here at all, just a frame pump that
//! treats whatever bytes arrive as opaque and forwards them unchanged,
//! bounded by the same 64 MiB ceiling `director_core::connection` dials
//! with.

use bytes::Bytes;
use h2::{RecvStream, SendStream};

use director_core::connection::MAX_MESSAGE_SIZE;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("message exceeded the {MAX_MESSAGE_SIZE} byte limit")]
    MessageTooLarge,
    #[error(transparent)]
    H2(#[from] h2::Error),
}

/// Copies every DATA frame from `recv` to `send`, verbatim, releasing flow
/// control as each frame is consumed, then forwards whatever trailers (if
/// any) terminated the source stream. This is the one piece of code that
/// runs on every byte of every proxied call in both directions; it must
/// never branch on message content.
///
/// Callers must check whether the source stream already ended at the
/// initial HEADERS frame (a Trailers-Only response) before calling this:
/// `pipe` assumes there is at least one more frame, trailer or otherwise,
/// still to come.
pub async fn pipe(mut recv: RecvStream, mut send: SendStream<Bytes>) -> Result<(), CodecError> {
    let mut forwarded: usize = 0;

    while let Some(chunk) = recv.data().await.transpose()? {
        forwarded += chunk.len();
        if forwarded > MAX_MESSAGE_SIZE {
            send.send_reset(h2::Reason::INTERNAL_ERROR);
            return Err(CodecError::MessageTooLarge);
        }
        let len = chunk.len();
        send.send_data(chunk, false)?;
        recv.flow_control().release_capacity(len)?;
    }

    match recv.trailers().await? {
        Some(trailers) => send.send_trailers(trailers)?,
        None => send.send_data(Bytes::new(), true)?,
    }

    Ok(())
}
