use std::path::{Path, PathBuf};

use anyhow::Result;
use dirs::home_dir;
use git2::{Cred, CredentialType, Error, FetchOptions, RemoteCallbacks};

use crate::log::{Level, Logger};

/// libgit2 asks again every time the server rejects a credential.
const MAX_CREDENTIAL_ATTEMPTS: u8 = 3;

/// Private key used for ssh transports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAuth {
    pub private_key: PathBuf,
}

/// Checks that the key file can be read before any network traffic.
pub fn load_key_auth(path: &Path) -> std::io::Result<KeyAuth> {
    let meta = std::fs::metadata(path)?;
    if !meta.is_file() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "not a regular file",
        ));
    }
    std::fs::File::open(path)?;
    Ok(KeyAuth {
        private_key: path.to_path_buf(),
    })
}

pub fn find_ssh_key() -> Option<PathBuf> {
    let home = home_dir()?;
    ["id_ed25519", "id_rsa"]
        .iter()
        .map(|name| home.join(".ssh").join(name))
        .find(|path| path.exists())
}

/// Sends the server's progress text to the logger, one debug entry per line.
fn report_progress(logger: &Logger, data: &[u8]) {
    let text = String::from_utf8_lossy(data);
    for line in text.split(['\r', '\n']).map(str::trim).filter(|l| !l.is_empty()) {
        logger.log_blocking(Level::Debug, "remote", &[("progress", line)]);
    }
}

/// Credential and progress callbacks for fetch and clone.
///
/// With an explicit key only that key is offered. Without one the agent is
/// tried first, then the default key files, then default credentials.
pub fn remote_callbacks<'a>(
    auth: Option<&KeyAuth>,
    progress: Option<&Logger>,
) -> RemoteCallbacks<'a> {
    let auth = auth.cloned();
    let default_key = find_ssh_key();
    let mut attempts: u8 = 0;

    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |_url, username_from_url, allowed_types| {
        attempts += 1;
        if attempts > MAX_CREDENTIAL_ATTEMPTS {
            return Err(Error::from_str("authentication failed: credentials rejected"));
        }
        let username = username_from_url.unwrap_or("git");

        if allowed_types.contains(CredentialType::USERNAME) {
            return Cred::username(username);
        }

        if allowed_types.contains(CredentialType::SSH_KEY) {
            if let Some(auth) = &auth {
                return Cred::ssh_key(username, None, &auth.private_key, None);
            }
            if attempts == 1
                && let Ok(cred) = Cred::ssh_key_from_agent(username)
            {
                return Ok(cred);
            }
            if let Some(path) = &default_key {
                return Cred::ssh_key(username, None, path, None);
            }
        }

        if allowed_types.contains(CredentialType::DEFAULT) {
            return Cred::default();
        }

        Err(Error::from_str("no authentication methods available"))
    });

    if let Some(logger) = progress.filter(|l| l.enabled(Level::Debug)).cloned() {
        callbacks.sideband_progress(move |data| {
            report_progress(&logger, data);
            true
        });
    }
    callbacks
}

pub fn fetch_options<'a>(
    auth: Option<&KeyAuth>,
    progress: Option<&Logger>,
) -> FetchOptions<'a> {
    let mut fo = FetchOptions::new();
    fo.remote_callbacks(remote_callbacks(auth, progress));
    fo
}

/// Short `owner/repo` style name for a remote URL or local path.
pub fn repo_display_name(remote: &str) -> Result<String> {
    let s = remote.trim();
    if s.is_empty() {
        return Err(anyhow::anyhow!("empty remote"));
    }

    let path = if let Some(scheme_pos) = s.find("://") {
        let after_scheme = &s[scheme_pos + 3..];
        let slash_idx = after_scheme
            .find('/')
            .ok_or_else(|| anyhow::anyhow!("no path after scheme in remote URL"))?;
        &after_scheme[slash_idx..]
    } else if let Some(colon_idx) = s.rfind(':')
        && !s.starts_with('/')
    {
        &s[colon_idx + 1..]
    } else {
        s
    };

    let mut path = path;
    if let Some(cut) = path.find(['?', '#']) {
        path = &path[..cut];
    }
    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [] => Err(anyhow::anyhow!("no repository path in remote: {remote}")),
        [name] => Ok(name.to_string()),
        [.., owner, name] => Ok(format!("{owner}/{name}")),
    }
}
