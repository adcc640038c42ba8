//! Ordered authentication attempt: private key with passphrase, private
//! key without passphrase, password, agent socket (spec §4.4.3).

use russh::client::Handle;
use xec_core::{SshConnectionConfig, XecError};

use crate::connection::ClientHandler;

/// Try each configured credential in order; fail with `SshAuthFailed` only
/// once every method has been exhausted.
pub(crate) async fn authenticate(
    session: &mut Handle<ClientHandler>,
    config: &SshConnectionConfig,
) -> Result<(), XecError> {
    let user = &config.username;
    let creds = &config.credentials;

    if let Some(key_material) = &creds.private_key_material {
        let passphrase = creds.passphrase.as_deref();
        match load_private_key(key_material, passphrase) {
            Ok(key) => {
                let auth = session
                    .authenticate_publickey(user, key)
                    .await
                    .map_err(|e| ssh_connect_err(config, e))?;
                if auth.success() {
                    return Ok(());
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "private key rejected, trying next method");
            }
        }
    }

    if let Some(password) = &creds.password {
        let auth = session
            .authenticate_password(user, password)
            .await
            .map_err(|e| ssh_connect_err(config, e))?;
        if auth.success() {
            return Ok(());
        }
    }

    if let Ok(sock) = std::env::var("SSH_AUTH_SOCK") {
        if !sock.is_empty() {
            match try_agent_auth(session, user, &sock).await {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(e) => tracing::debug!(error = %e, "agent authentication failed"),
            }
        }
    }

    Err(XecError::SshAuthFailed {
        host: config.host.clone(),
        user: user.clone(),
    })
}

fn load_private_key(
    pem: &str,
    passphrase: Option<&str>,
) -> Result<russh::keys::PrivateKeyWithHashAlg, anyhow::Error> {
    let key = russh::keys::decode_secret_key(pem, passphrase)?;
    Ok(russh::keys::PrivateKeyWithHashAlg::new(
        std::sync::Arc::new(key),
        Some(russh::keys::HashAlg::Sha256),
    ))
}

async fn try_agent_auth(
    session: &mut Handle<ClientHandler>,
    user: &str,
    _sock_path: &str,
) -> Result<bool, anyhow::Error> {
    let mut agent = russh::keys::agent::client::AgentClient::connect_env().await?;
    let identities = agent.request_identities().await?;
    for key in identities {
        let key = std::sync::Arc::new(key);
        let (returned_agent, auth) = session
            .authenticate_future(
                user,
                russh::keys::PrivateKeyWithHashAlg::new(key, Some(russh::keys::HashAlg::Sha256)),
                agent,
            )
            .await;
        agent = returned_agent;
        if auth.map(|r| r.success()).unwrap_or(false) {
            return Ok(true);
        }
    }
    Ok(false)
}

fn ssh_connect_err(config: &SshConnectionConfig, source: russh::Error) -> XecError {
    XecError::SshConnectFailed {
        host: config.host.clone(),
        port: config.port,
        source: anyhow::Error::from(source),
    }
}
