use std::path::{Path, PathBuf};

use gozlem_core::models::domain::Locale;
use gozlem_core::storage_keys;
use gozlem_service::config::ServiceConfig;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Schema version written by this build. Each step up needs an entry in
/// [`MIGRATIONS`].
pub const CURRENT_VERSION: u32 = 1;

const APP_DIR: &str = "com.gozlem.cli";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GozlemConfig {
    /// 0 when the file predates versioning.
    #[serde(default)]
    pub config_version: u32,
    pub region: String,
    pub bucket: String,
    /// Teacher recorded as the author of every submitted observation.
    pub author_id: Uuid,
    pub queue_path: PathBuf,
    /// Added in v1.
    #[serde(default)]
    pub service: ServiceConfig,
    pub created_at: jiff::Timestamp,
    pub credentials: CredentialSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialSource {
    Inline {
        access_key_id: String,
        secret_access_key: String,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        session_token: Option<String>,
    },
    Profile {
        profile_name: String,
    },
    DefaultChain,
}

/// Redacted config info safe to print.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigInfo {
    pub path: PathBuf,
    pub region: String,
    pub bucket: String,
    pub author_id: Uuid,
    pub queue_path: PathBuf,
    pub locale: Locale,
    pub created_at: String,
    pub credential_type: String,
    pub profile_name: Option<String>,
    pub access_key_hint: Option<String>,
}

fn app_dir(base: Option<PathBuf>) -> eyre::Result<PathBuf> {
    let base = base.ok_or_else(|| eyre::eyre!("no config directory found"))?;
    Ok(base.join(APP_DIR))
}

pub fn default_config_path() -> eyre::Result<PathBuf> {
    Ok(app_dir(dirs::config_dir())?.join("config.json"))
}

/// Where the offline queue lives unless the config says otherwise.
pub fn default_queue_path() -> eyre::Result<PathBuf> {
    Ok(app_dir(dirs::data_local_dir())?.join(storage_keys::OFFLINE_QUEUE_FILE))
}

pub fn load_config(path: &Path) -> eyre::Result<GozlemConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        eyre::eyre!(
            "failed to read config at {}: {e} (run `gozlem init` first)",
            path.display()
        )
    })?;

    let raw: serde_json::Value = serde_json::from_str(&contents)?;
    let version = raw
        .get("config_version")
        .and_then(serde_json::Value::as_u64)
        .map_or(0, |v| u32::try_from(v).unwrap_or(u32::MAX));

    Ok(serde_json::from_value(migrate(raw, version)?)?)
}

type Migration = fn(&mut serde_json::Map<String, serde_json::Value>) -> eyre::Result<()>;

/// `MIGRATIONS[n]` lifts a version-`n` document to version `n + 1`.
const MIGRATIONS: &[Migration] = &[add_service_settings];

fn add_service_settings(doc: &mut serde_json::Map<String, serde_json::Value>) -> eyre::Result<()> {
    if !doc.contains_key("service") {
        doc.insert(
            "service".to_string(),
            serde_json::to_value(ServiceConfig::default())?,
        );
    }
    Ok(())
}

/// Bring a raw config document from `from_version` to [`CURRENT_VERSION`].
pub fn migrate(mut raw: serde_json::Value, from_version: u32) -> eyre::Result<serde_json::Value> {
    if from_version > CURRENT_VERSION {
        return Err(eyre::eyre!(
            "config_version {from_version} is newer than this build supports ({CURRENT_VERSION}); \
             upgrade gozlem to read it"
        ));
    }

    let doc = raw
        .as_object_mut()
        .ok_or_else(|| eyre::eyre!("config is not a JSON object"))?;
    for (version, step) in MIGRATIONS.iter().enumerate().skip(from_version as usize) {
        step(doc)?;
        let next = version as u32 + 1;
        doc.insert("config_version".to_string(), next.into());
        tracing::info!(from = version, to = next, "config migrated");
    }
    Ok(raw)
}

/// Write `config` stamped with [`CURRENT_VERSION`], replacing `path` atomically.
pub fn save_config(path: &Path, config: &GozlemConfig) -> eyre::Result<()> {
    let stamped = GozlemConfig {
        config_version: CURRENT_VERSION,
        ..config.clone()
    };
    write_private(path, serde_json::to_string_pretty(&stamped)?.as_bytes())?;
    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}

/// Owner-only file contents via a sibling temp file and rename. The config
/// may hold access keys.
fn write_private(path: &Path, bytes: &[u8]) -> eyre::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| eyre::eyre!("config path {} has no parent", path.display()))?;
    std::fs::create_dir_all(dir)?;

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, bytes)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))?;
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

pub fn config_info(path: &Path, config: &GozlemConfig) -> ConfigInfo {
    let (credential_type, profile_name, access_key_hint) = match &config.credentials {
        CredentialSource::Inline {
            access_key_id,
            session_token: Some(_),
            ..
        } => ("temporary", None, Some(redact_access_key(access_key_id))),
        CredentialSource::Inline { access_key_id, .. } => {
            ("inline", None, Some(redact_access_key(access_key_id)))
        }
        CredentialSource::Profile { profile_name } => ("profile", Some(profile_name.clone()), None),
        CredentialSource::DefaultChain => ("default_chain", None, None),
    };

    ConfigInfo {
        path: path.to_path_buf(),
        region: config.region.clone(),
        bucket: config.bucket.clone(),
        author_id: config.author_id,
        queue_path: config.queue_path.clone(),
        locale: config.service.locale,
        created_at: config.created_at.to_string(),
        credential_type: credential_type.to_string(),
        profile_name,
        access_key_hint,
    }
}

/// First and last four characters of an access key id.
fn redact_access_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}
