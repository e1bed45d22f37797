//! Credentials for fetching repositories
//!
//! Authentication is delegated to git's own mechanisms: the SSH agent, keys
//! in `~/.ssh`, and configured credential helpers. Public HTTPS repositories
//! need none of them.

use std::path::PathBuf;

use git2::{Cred, CredentialType, Error, ErrorClass, ErrorCode, RemoteCallbacks};

const SSH_KEY_NAMES: &[&str] = &["id_ed25519", "id_ecdsa", "id_rsa"];

fn auth_error(message: &str) -> Error {
    Error::new(ErrorCode::Auth, ErrorClass::Http, message)
}

fn ssh_key_files() -> impl Iterator<Item = (PathBuf, Option<PathBuf>)> {
    let ssh_dir = dirs::home_dir().unwrap_or_default().join(".ssh");
    SSH_KEY_NAMES.iter().filter_map(move |name| {
        let private = ssh_dir.join(name);
        if !private.is_file() {
            return None;
        }
        let public = ssh_dir.join(format!("{name}.pub"));
        Some((private, public.is_file().then_some(public)))
    })
}

fn ssh_credentials(username: &str) -> Result<Cred, Error> {
    if let Ok(cred) = Cred::ssh_key_from_agent(username) {
        return Ok(cred);
    }
    ssh_key_files()
        .find_map(|(private, public)| {
            Cred::ssh_key(username, public.as_deref(), &private, None).ok()
        })
        .ok_or_else(|| auth_error("no usable SSH key"))
}

fn helper_credentials(url: &str, username: Option<&str>) -> Result<Cred, Error> {
    let config = git2::Config::open_default().or_else(|_| git2::Config::new())?;
    Cred::credential_helper(&config, url, username)
        .map_err(|_| auth_error("no credentials available from git credential helpers"))
}

/// Install the credential callback on `callbacks`
pub fn install(callbacks: &mut RemoteCallbacks) {
    callbacks.credentials(|url, username_from_url, allowed| {
        if allowed.contains(CredentialType::DEFAULT) {
            return Cred::default();
        }
        if allowed.contains(CredentialType::SSH_KEY) {
            return ssh_credentials(username_from_url.unwrap_or("git"));
        }
        if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
            return helper_credentials(url, username_from_url);
        }
        Err(auth_error("authentication failed"))
    });
}
