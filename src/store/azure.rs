//! Azure Blob Storage adapter on `object_store`'s `MicrosoftAzure` client.
//!
//! Each namespace is a container; each key is a blob name. The connection
//! string is parsed once into [`AzureSettings`]; a client is built lazily per
//! container and cached, since an `object_store` Azure client is bound to one
//! container.
//!
//! Recognised connection-string fields (case-insensitive):
//!
//! | Field | Use |
//! |-------|-----|
//! | `AccountName` | storage account; derived from `BlobEndpoint` when absent |
//! | `AccountKey` | shared-key signing |
//! | `SharedAccessSignature` | SAS token, preferred over `AccountKey`, leading `?` optional |
//! | `BlobEndpoint` | full endpoint URL, wins over the two below |
//! | `DefaultEndpointsProtocol` | default `https` |
//! | `EndpointSuffix` | default `core.windows.net` |
//! | `UseDevelopmentStorage` | `true` targets the local Azurite emulator |

use super::{ObjectStore, StoreError};
use async_trait::async_trait;
use object_store::azure::{AzureConfigKey, MicrosoftAzure, MicrosoftAzureBuilder};
use object_store::path::Path as ObjectPath;
use object_store::{
    Attribute, Attributes, ObjectStore as RemoteStore, PutOptions, PutPayload,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::debug;
use url::Url;

/// Azurite blob endpoint used for `UseDevelopmentStorage=true`.
const EMULATOR_ENDPOINT: &str = "http://127.0.0.1:10000/devstoreaccount1";

/// How requests are authorised.
#[derive(Clone, PartialEq, Eq)]
pub enum AzureCredential {
    /// Shared-key signing with the base64 account key.
    AccessKey(String),
    /// Shared access signature query string, without the leading `?`.
    Sas(String),
    /// Well-known emulator credentials.
    Emulator,
}

impl fmt::Debug for AzureCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AzureCredential::AccessKey(_) => f.write_str("AccessKey(<redacted>)"),
            AzureCredential::Sas(_) => f.write_str("Sas(<redacted>)"),
            AzureCredential::Emulator => f.write_str("Emulator"),
        }
    }
}

/// Parsed connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureSettings {
    pub account: String,
    pub credential: AzureCredential,
    /// Blob service endpoint, e.g. `https://acct.blob.core.windows.net`.
    pub endpoint: Url,
}

impl AzureSettings {
    /// Parse an Azure storage connection string.
    pub fn from_connection_string(connection_string: &str) -> Result<Self, StoreError> {
        let invalid = |reason: String| StoreError::InvalidConfig(reason);

        let mut fields: HashMap<String, String> = HashMap::new();
        for part in connection_string
            .split(';')
            .map(str::trim)
            .filter(|p| !p.is_empty())
        {
            let (name, value) = part.split_once('=').ok_or_else(|| {
                invalid(format!(
                    "malformed connection string segment '{}'",
                    redact(part)
                ))
            })?;
            fields.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }

        if fields
            .get("usedevelopmentstorage")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
        {
            return Ok(Self {
                account: "devstoreaccount1".into(),
                credential: AzureCredential::Emulator,
                endpoint: parse_endpoint(EMULATOR_ENDPOINT)?,
            });
        }

        let endpoint = match fields.get("blobendpoint") {
            Some(endpoint) => parse_endpoint(endpoint)?,
            None => {
                let account = fields.get("accountname").ok_or_else(|| {
                    invalid("connection string needs BlobEndpoint or AccountName".into())
                })?;
                let protocol = fields
                    .get("defaultendpointsprotocol")
                    .map(String::as_str)
                    .unwrap_or("https");
                let suffix = fields
                    .get("endpointsuffix")
                    .map(String::as_str)
                    .unwrap_or("core.windows.net");
                parse_endpoint(&format!("{protocol}://{account}.blob.{suffix}"))?
            }
        };

        let account = match fields.get("accountname") {
            Some(account) if !account.is_empty() => account.clone(),
            _ => endpoint
                .host_str()
                .and_then(|host| host.split('.').next())
                .filter(|label| !label.is_empty())
                .map(str::to_string)
                .ok_or_else(|| {
                    invalid("cannot derive AccountName from BlobEndpoint".into())
                })?,
        };

        let sas = fields
            .get("sharedaccesssignature")
            .map(|s| s.trim_start_matches('?'))
            .filter(|s| !s.is_empty());
        let key = fields.get("accountkey").filter(|k| !k.is_empty());
        let credential = match (sas, key) {
            (Some(sas), _) => AzureCredential::Sas(sas.to_string()),
            (None, Some(key)) => AzureCredential::AccessKey(key.clone()),
            (None, None) => {
                return Err(invalid(
                    "connection string has neither SharedAccessSignature nor AccountKey".into(),
                ))
            }
        };

        Ok(Self {
            account,
            credential,
            endpoint,
        })
    }

    /// Client builder for one container.
    fn builder(&self, container: &str) -> MicrosoftAzureBuilder {
        let builder = MicrosoftAzureBuilder::new().with_container_name(container);
        match &self.credential {
            AzureCredential::Emulator => builder.with_use_emulator(true),
            AzureCredential::AccessKey(key) => self.endpoint_on(builder).with_access_key(key),
            AzureCredential::Sas(sas) => self
                .endpoint_on(builder)
                .with_config(AzureConfigKey::SasKey, sas),
        }
    }

    fn endpoint_on(&self, builder: MicrosoftAzureBuilder) -> MicrosoftAzureBuilder {
        builder
            .with_account(&self.account)
            .with_endpoint(self.endpoint.as_str().trim_end_matches('/').to_string())
            .with_allow_http(self.endpoint.scheme() == "http")
    }
}

fn parse_endpoint(raw: &str) -> Result<Url, StoreError> {
    let endpoint = Url::parse(raw).map_err(|e| {
        StoreError::InvalidConfig(format!("invalid blob endpoint '{}': {}", raw, e))
    })?;
    if !matches!(endpoint.scheme(), "http" | "https") || endpoint.cannot_be_a_base() {
        return Err(StoreError::InvalidConfig(format!(
            "blob endpoint must be an http(s) URL, got '{}'",
            endpoint
        )));
    }
    Ok(endpoint)
}

pub struct AzureBlobStore {
    settings: AzureSettings,
    containers: Mutex<HashMap<String, Arc<MicrosoftAzure>>>,
}

impl fmt::Debug for AzureBlobStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureBlobStore")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl AzureBlobStore {
    pub fn from_connection_string(connection_string: &str) -> Result<Self, StoreError> {
        Self::new(AzureSettings::from_connection_string(connection_string)?)
    }

    /// Store for `settings`. Fails if the settings cannot produce a client.
    pub fn new(settings: AzureSettings) -> Result<Self, StoreError> {
        // `$root` is always a legal container name; building it surfaces
        // credential and endpoint problems before the first request.
        settings
            .builder("$root")
            .build()
            .map_err(|e| StoreError::InvalidConfig(redact(&e.to_string())))?;
        Ok(Self {
            settings,
            containers: Mutex::new(HashMap::new()),
        })
    }

    pub fn settings(&self) -> &AzureSettings {
        &self.settings
    }

    fn container(&self, name: &str) -> Result<Arc<MicrosoftAzure>, StoreError> {
        let mut containers = self
            .containers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(client) = containers.get(name) {
            return Ok(client.clone());
        }
        let client = Arc::new(
            self.settings
                .builder(name)
                .build()
                .map_err(|e| StoreError::InvalidConfig(redact(&e.to_string())))?,
        );
        debug!("Built blob client for container {}", name);
        containers.insert(name.to_string(), client.clone());
        Ok(client)
    }

    /// Blob URL, never carrying credentials.
    fn blob_url(&self, container: &str, blob: &str) -> Url {
        let mut url = self.settings.endpoint.clone();
        url.set_query(None);
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(container).extend(blob.split('/'));
        }
        url
    }
}

#[async_trait]
impl ObjectStore for AzureBlobStore {
    async fn get(&self, namespace: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let client = self.container(namespace)?;
        let path = ObjectPath::from(key);
        let result = client
            .get(&path)
            .await
            .map_err(|e| backend_error(namespace, key, e))?;
        let bytes = result
            .bytes()
            .await
            .map_err(|e| backend_error(namespace, key, e))?;
        debug!("Downloaded {}/{} ({} bytes)", namespace, key, bytes.len());
        Ok(bytes.to_vec())
    }

    async fn exists(&self, namespace: &str, key: &str) -> Result<bool, StoreError> {
        let client = self.container(namespace)?;
        match client.head(&ObjectPath::from(key)).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(backend_error(namespace, key, e)),
        }
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<(), StoreError> {
        let client = self.container(namespace)?;
        match client.delete(&ObjectPath::from(key)).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(backend_error(namespace, key, e)),
        }
    }

    async fn put(
        &self,
        namespace: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError> {
        let client = self.container(namespace)?;
        let len = bytes.len();

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        let options = PutOptions {
            attributes,
            ..Default::default()
        };

        client
            .put_opts(&ObjectPath::from(key), PutPayload::from(bytes), options)
            .await
            .map_err(|e| backend_error(namespace, key, e))?;
        debug!("Uploaded {}/{} ({} bytes)", namespace, key, len);
        Ok(())
    }

    fn location(&self, namespace: &str, key: &str) -> String {
        self.blob_url(namespace, key).to_string()
    }
}

fn backend_error(namespace: &str, key: &str, err: object_store::Error) -> StoreError {
    match err {
        object_store::Error::NotFound { .. } => StoreError::NotFound {
            namespace: namespace.to_string(),
            key: key.to_string(),
        },
        other => StoreError::Backend(redact(&other.to_string())),
    }
}

/// Strip anything that looks like a SAS signature from a message.
fn redact(message: &str) -> String {
    match message.find("sig=") {
        Some(idx) => format!("{}sig=<redacted>", &message[..idx]),
        None => message.to_string(),
    }
}
