//! A pooled SSH connection: one `russh` client handle plus the keep-alive
//! task that pings it so the far end never idle-closes it (spec §3.3,
//! §4.4.1).

use std::sync::Arc;
use std::time::Duration;

use russh::client::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, trace};
use xec_core::PoolKey;

/// The handler `russh` calls back into for host-key verification and
/// similar session events. We accept any host key: the engine has no
/// notion of a known_hosts store (spec leaves host-key pinning to the
/// caller's SSH config, consistent with §1's "not a shell interpreter").
pub(crate) struct ClientHandler;

impl russh::client::Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &russh::keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

/// One authenticated SSH session, owning zero or more channels opened for
/// concurrent execs or file transfers (spec §3.3: "The connection is the
/// unit of ownership; channels are owned by the connection.").
pub struct SshConnection {
    pub(crate) key: PoolKey,
    pub(crate) handle: Handle<ClientHandler>,
    keepalive: JoinHandle<()>,
}

impl SshConnection {
    pub(crate) fn new(key: PoolKey, handle: Handle<ClientHandler>, keepalive_interval: Duration) -> Arc<Self> {
        let keepalive_handle = handle.clone();
        let keepalive_key = key.clone();
        let keepalive = tokio::spawn(async move {
            let mut interval = tokio::time::interval(keepalive_interval);
            interval.tick().await; // first tick fires immediately; skip it
            loop {
                interval.tick().await;
                trace!(host = %keepalive_key.host, "sending SSH keepalive");
                if keepalive_handle
                    .send_keepalive(true)
                    .await
                    .is_err()
                {
                    debug!(host = %keepalive_key.host, "keepalive failed, connection presumed dead");
                    break;
                }
            }
        });

        Arc::new(Self {
            key,
            handle,
            keepalive,
        })
    }

    /// Open a fresh session channel for one exec or SFTP subsystem
    /// request. Each concurrent use of a connection gets its own channel
    /// (spec §3.3, §5 "Scheduling model").
    pub(crate) async fn open_channel(
        &self,
    ) -> Result<russh::Channel<russh::client::Msg>, russh::Error> {
        self.handle.channel_open_session().await
    }
}

impl Drop for SshConnection {
    fn drop(&mut self) {
        self.keepalive.abort();
        debug!(host = %self.key.host, "ssh connection dropped");
    }
}
