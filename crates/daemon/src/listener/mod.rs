// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TCP listener for client, coordinator, and minion connections.
//!
//! Each connection runs in its own task and may carry many sequential
//! requests. While a request is being handled the connection is watched for
//! EOF; if the peer goes away the handler future is dropped.

mod dispatch;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use sd_core::{Clock, ErrorCode};
use sd_wire::{ProtocolError, Response};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::service::Services;

/// Shared daemon context for all request handlers.
pub struct ListenCtx<C: Clock> {
    pub services: Services<C>,
    pub start_time: Instant,
    /// Notified when a client sends `Shutdown`.
    pub shutdown: Arc<Notify>,
    /// Bound on reading one request and writing its response.
    pub ipc_timeout: Duration,
    /// Retention used by `PruneBuilds` when the request names none.
    pub build_retention: Duration,
}

/// Accepts connections until cancelled.
pub struct Listener<C: Clock> {
    tcp: TcpListener,
    ctx: Arc<ListenCtx<C>>,
}

/// Errors from connection handling.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl<C: Clock> Listener<C> {
    pub fn new(tcp: TcpListener, ctx: Arc<ListenCtx<C>>) -> Self {
        Self { tcp, ctx }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.tcp.local_addr()
    }

    /// Run the accept loop, spawning a task per connection.
    pub async fn run(self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("listener stopped");
                    return;
                }
                result = self.tcp.accept() => match result {
                    Ok((stream, peer)) => {
                        debug!(%peer, "connection accepted");
                        let ctx = Arc::clone(&self.ctx);
                        tokio::spawn(async move {
                            let (reader, writer) = stream.into_split();
                            if let Err(e) = handle_connection(reader, writer, &ctx).await {
                                log_connection_error(e);
                            }
                        });
                    }
                    Err(e) => error!(error = %e, "accept error"),
                },
            }
        }
    }
}

fn log_connection_error(e: ConnectionError) {
    match e {
        ConnectionError::Protocol(ProtocolError::ConnectionClosed) => {
            debug!("client disconnected")
        }
        ConnectionError::Protocol(ProtocolError::Timeout) => warn!("connection timeout"),
        _ => error!(error = %e, "connection error"),
    }
}

/// Serve requests on one connection until the peer closes it.
///
/// A peer that goes quiet after at least one request is treated as done
/// rather than timed out.
async fn handle_connection<R, W, C>(
    reader: R,
    mut writer: W,
    ctx: &ListenCtx<C>,
) -> Result<(), ConnectionError>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
    C: Clock,
{
    let mut reader = BufReader::new(reader);
    let mut served = 0u64;
    loop {
        let request = match sd_wire::read_request(&mut reader, ctx.ipc_timeout).await {
            Ok(request) => request,
            Err(ProtocolError::ConnectionClosed) if served > 0 => return Ok(()),
            Err(ProtocolError::Timeout) if served > 0 => {
                debug!(served, "idle connection closed");
                return Ok(());
            }
            Err(e @ (ProtocolError::Json(_) | ProtocolError::MessageTooLarge { .. })) => {
                let response = Response::error(ErrorCode::Protocol, e.to_string());
                let _ = sd_wire::write_response(&mut writer, &response, ctx.ipc_timeout).await;
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };

        if request.is_poll() {
            debug!(request = %request, stampede_id = ?request.stampede_id(), "received request");
        } else {
            info!(request = %request, stampede_id = ?request.stampede_id(), "received request");
        }

        let response = tokio::select! {
            response = dispatch::handle_request(request, ctx) => response,
            _ = detect_client_disconnect(&mut reader) => {
                debug!("client disconnected, cancelling handler");
                return Ok(());
            }
        };

        sd_wire::write_response(&mut writer, &response, ctx.ipc_timeout).await?;
        served += 1;
        if matches!(response, Response::ShuttingDown) {
            return Ok(());
        }
    }
}

/// Resolves only when the peer has closed its side.
///
/// Bytes that arrive early (a pipelined next request) stay in the buffer for
/// the next read.
async fn detect_client_disconnect<R: AsyncRead + Unpin>(reader: &mut BufReader<R>) {
    match reader.fill_buf().await {
        Ok([]) | Err(_) => {}
        Ok(_) => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
#[path = "../listener_tests.rs"]
mod tests;
