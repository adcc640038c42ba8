//! File transfer over SFTP on a dedicated channel (spec §4.4.5): atomic
//! destination writes (`*.partial` then rename), directory tree walks,
//! streaming large files without buffering the whole thing in memory.

use std::path::{Path, PathBuf};

use russh_sftp::client::SftpSession;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use xec_core::XecError;

use crate::connection::SshConnection;

const STREAM_CHUNK: usize = 32 * 1024;

async fn open_sftp(connection: &SshConnection) -> Result<SftpSession, XecError> {
    let channel = connection
        .open_channel()
        .await
        .map_err(|e| XecError::SshChannelFailed(e.to_string()))?;
    channel
        .request_subsystem(true, "sftp")
        .await
        .map_err(|e| XecError::SshChannelFailed(e.to_string()))?;
    SftpSession::new(channel.into_stream())
        .await
        .map_err(|e| XecError::SshChannelFailed(format!("sftp init failed: {e}")))
}

/// Upload `local` to `remote`. Directories are walked recursively; empty
/// directories are created on the far side. No metadata is preserved --
/// permissions must be restated by an explicit `chmod` exec afterward.
pub(crate) async fn upload(
    connection: &SshConnection,
    local: &Path,
    remote: &str,
) -> Result<(), XecError> {
    let sftp = open_sftp(connection).await?;
    if local.is_dir() {
        upload_dir(&sftp, local, remote).await
    } else {
        upload_file(&sftp, local, remote).await
    }
}

async fn upload_dir(sftp: &SftpSession, local: &Path, remote: &str) -> Result<(), XecError> {
    sftp.create_dir(remote).await.ok();
    let mut entries = tokio::fs::read_dir(local)
        .await
        .map_err(|e| XecError::Internal(format!("reading {}: {e}", local.display())))?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| XecError::Internal(e.to_string()))?
    {
        let name = entry.file_name();
        let remote_child = format!("{}/{}", remote.trim_end_matches('/'), name.to_string_lossy());
        let local_child = entry.path();
        if local_child.is_dir() {
            Box::pin(upload_dir(sftp, &local_child, &remote_child)).await?;
        } else {
            upload_file(sftp, &local_child, &remote_child).await?;
        }
    }
    Ok(())
}

async fn upload_file(sftp: &SftpSession, local: &Path, remote: &str) -> Result<(), XecError> {
    let partial = format!("{remote}.partial");
    let mut src = tokio::fs::File::open(local)
        .await
        .map_err(|e| XecError::Internal(format!("opening {}: {e}", local.display())))?;
    {
        let mut dest = sftp
            .create(&partial)
            .await
            .map_err(|e| XecError::SshChannelFailed(format!("sftp create {partial}: {e}")))?;
        let mut buf = vec![0u8; STREAM_CHUNK];
        loop {
            let n = src
                .read(&mut buf)
                .await
                .map_err(|e| XecError::Internal(e.to_string()))?;
            if n == 0 {
                break;
            }
            dest.write_all(&buf[..n])
                .await
                .map_err(|e| XecError::SshChannelFailed(format!("sftp write {partial}: {e}")))?;
        }
        dest.shutdown()
            .await
            .map_err(|e| XecError::SshChannelFailed(e.to_string()))?;
    }
    sftp.rename(&partial, remote)
        .await
        .map_err(|e| XecError::SshChannelFailed(format!("sftp rename {partial} -> {remote}: {e}")))?;
    Ok(())
}

/// Download `remote` to `local`. Rejects a remote path that is a symlink
/// whose target escapes the transfer root when the caller has asked to
/// preserve mode bits (spec §4.4.5) -- here expressed as a simple
/// "refuse symlinks outright" check, since the engine never preserves
/// metadata by default and callers wanting symlink-following can `tar`
/// over the plain exec path instead.
pub(crate) async fn download(
    connection: &SshConnection,
    remote: &str,
    local: &Path,
) -> Result<(), XecError> {
    let sftp = open_sftp(connection).await?;
    let metadata = sftp
        .metadata(remote)
        .await
        .map_err(|e| XecError::SshChannelFailed(format!("sftp stat {remote}: {e}")))?;
    if metadata.is_symlink() {
        return Err(XecError::SshChannelFailed(format!(
            "refusing to download {remote}: symlink targets are not followed"
        )));
    }
    if metadata.is_dir() {
        download_dir(&sftp, remote, local).await
    } else {
        download_file(&sftp, remote, local).await
    }
}

async fn download_dir(sftp: &SftpSession, remote: &str, local: &Path) -> Result<(), XecError> {
    tokio::fs::create_dir_all(local)
        .await
        .map_err(|e| XecError::Internal(e.to_string()))?;
    let entries = sftp
        .read_dir(remote)
        .await
        .map_err(|e| XecError::SshChannelFailed(format!("sftp readdir {remote}: {e}")))?;
    for entry in entries {
        let name = entry.file_name();
        if name == "." || name == ".." {
            continue;
        }
        let remote_child = format!("{}/{}", remote.trim_end_matches('/'), name);
        let local_child: PathBuf = local.join(&name);
        if entry.file_type().is_dir() {
            Box::pin(download_dir(sftp, &remote_child, &local_child)).await?;
        } else {
            download_file(sftp, &remote_child, &local_child).await?;
        }
    }
    Ok(())
}

async fn download_file(sftp: &SftpSession, remote: &str, local: &Path) -> Result<(), XecError> {
    let partial = local.with_extension("partial");
    let mut src = sftp
        .open(remote)
        .await
        .map_err(|e| XecError::SshChannelFailed(format!("sftp open {remote}: {e}")))?;
    {
        let mut dest = tokio::fs::File::create(&partial)
            .await
            .map_err(|e| XecError::Internal(e.to_string()))?;
        let mut buf = vec![0u8; STREAM_CHUNK];
        loop {
            let n = src
                .read(&mut buf)
                .await
                .map_err(|e| XecError::SshChannelFailed(e.to_string()))?;
            if n == 0 {
                break;
            }
            dest.write_all(&buf[..n])
                .await
                .map_err(|e| XecError::Internal(e.to_string()))?;
        }
    }
    tokio::fs::rename(&partial, local)
        .await
        .map_err(|e| XecError::Internal(format!("renaming into place: {e}")))?;
    Ok(())
}
