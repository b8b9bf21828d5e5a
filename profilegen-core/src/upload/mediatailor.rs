use async_trait::async_trait;
use aws_config::default_provider::region::DefaultRegionChain;
use aws_config::meta::region::RegionProviderChain;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::provider::ProvideCredentials;
use chrono::Utc;
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::sigv4::{self, SigningParams};
use super::{ProfileStore, UploadError, UploadOutcome, UploadResult};
use crate::config::UploadSection;

const ACCOUNT_CHECK_PROFILE: &str = "nonExistentProfile";
const CONFLICT: &str = "conflict";

#[derive(Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl From<aws_credential_types::Credentials> for Credentials {
    fn from(credentials: aws_credential_types::Credentials) -> Self {
        Self {
            access_key_id: credentials.access_key_id().to_string(),
            secret_access_key: credentials.secret_access_key().to_string(),
            session_token: credentials.session_token().map(str::to_string),
        }
    }
}

/// Loads the shared AWS configuration for a named profile (or the default
/// one). Region precedence: explicit flag, settings file, then the SDK
/// default chain (`AWS_REGION`, `AWS_DEFAULT_REGION`, profile, IMDS).
pub async fn load_sdk_config(
    flag: Option<&str>,
    profile: Option<&str>,
    settings: &UploadSection,
) -> SdkConfig {
    let mut fallback = DefaultRegionChain::builder();
    if let Some(profile) = profile {
        fallback = fallback.profile_name(profile);
    }
    let region = RegionProviderChain::first_try(
        MediaTailorConfig::explicit_region(flag, settings).map(Region::new),
    )
    .or_else(fallback.build());

    let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region);
    if let Some(profile) = profile {
        loader = loader.profile_name(profile);
    }
    loader.load().await
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaTailorConfig {
    pub region: String,
    pub api_host: String,
    pub service: String,
}

impl MediaTailorConfig {
    pub fn for_region(region: impl Into<String>, settings: &UploadSection) -> Self {
        let region = region.into();
        Self {
            api_host: settings.api_host.replace("{region}", &region),
            service: settings.service.clone(),
            region,
        }
    }

    /// Flag, then settings file. Empty values fall through to the next source.
    pub fn explicit_region(flag: Option<&str>, settings: &UploadSection) -> Option<String> {
        flag.filter(|region| !region.is_empty())
            .map(str::to_string)
            .or_else(|| settings.region.clone().filter(|region| !region.is_empty()))
    }

    pub fn from_sdk_config(sdk: &SdkConfig, settings: &UploadSection) -> UploadResult<Self> {
        let region = sdk
            .region()
            .map(|region| region.to_string())
            .filter(|region| !region.is_empty())
            .ok_or(UploadError::MissingRegion)?;
        Ok(Self::for_region(region, settings))
    }

    pub fn endpoint(&self) -> UploadResult<Url> {
        Ok(Url::parse(&format!("https://{}/", self.api_host))?)
    }
}

/// Transcode-profile store backed by the MediaTailor REST API.
pub struct MediaTailorClient {
    client: Client,
    config: MediaTailorConfig,
    credentials: Credentials,
    endpoint: Url,
}

impl MediaTailorClient {
    pub fn new(
        client: Client,
        config: MediaTailorConfig,
        credentials: Credentials,
    ) -> UploadResult<Self> {
        let endpoint = config.endpoint()?;
        Ok(Self {
            client,
            config,
            credentials,
            endpoint,
        })
    }

    /// Builds a client with its own connection pool.
    pub fn connect(config: MediaTailorConfig, credentials: Credentials) -> UploadResult<Self> {
        let client = Client::builder().build()?;
        Self::new(client, config, credentials)
    }

    /// Resolves region and credentials through the AWS provider chains,
    /// honouring a named shared-config profile.
    pub async fn load(
        region: Option<&str>,
        profile: Option<&str>,
        settings: &UploadSection,
    ) -> UploadResult<Self> {
        let sdk = load_sdk_config(region, profile, settings).await;
        let config = MediaTailorConfig::from_sdk_config(&sdk, settings)?;
        let provider = sdk
            .credentials_provider()
            .ok_or(UploadError::MissingCredentials)?;
        let credentials = Credentials::from(provider.provide_credentials().await?);
        debug!(
            target: "profilegen.upload",
            region = %config.region,
            profile = profile.unwrap_or("default"),
            "resolved aws configuration"
        );
        Self::connect(config, credentials)
    }

    pub fn config(&self) -> &MediaTailorConfig {
        &self.config
    }

    fn profile_url(&self, name: &str) -> UploadResult<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .push("transcodeProfile")
            .push(name);
        Ok(url)
    }

    async fn send(&self, method: Method, url: Url, body: Vec<u8>) -> UploadResult<(StatusCode, String)> {
        let params = SigningParams {
            access_key_id: &self.credentials.access_key_id,
            secret_access_key: &self.credentials.secret_access_key,
            session_token: self.credentials.session_token.as_deref(),
            region: &self.config.region,
            service: &self.config.service,
        };
        let signed = sigv4::sign(method.as_str(), &url, &body, &params, Utc::now())?;
        debug!(target: "profilegen.upload", %method, %url, "sending signed request");

        let mut request = self.client.request(method, url);
        for (name, value) in signed.headers {
            // reqwest derives the host header from the url.
            if name != "host" {
                request = request.header(name, value);
            }
        }
        if !body.is_empty() {
            request = request.header("content-type", "application/json").body(body);
        }
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        Ok((status, text))
    }
}

#[async_trait]
impl ProfileStore for MediaTailorClient {
    async fn fetch_existing(&self, name: &str) -> UploadResult<Option<Value>> {
        let url = self.profile_url(name)?;
        let (status, body) = self.send(Method::GET, url, Vec::new()).await?;
        match status {
            StatusCode::OK => Ok(Some(serde_json::from_str(&body)?)),
            StatusCode::NOT_FOUND | StatusCode::FORBIDDEN => Ok(None),
            other => Err(unexpected("GetTranscodeProfile", other, body)),
        }
    }

    async fn upload(&self, name: &str, document: &Value) -> UploadResult<UploadOutcome> {
        let url = self.profile_url(name)?;
        let body = serde_json::to_vec(document)?;
        let (status, body) = self.send(Method::PUT, url, body).await?;
        match status {
            StatusCode::OK => Ok(UploadOutcome::applied("uploaded")),
            StatusCode::CONFLICT => Ok(UploadOutcome::skipped(CONFLICT)),
            other => Err(unexpected("PutTranscodeProfile", other, body)),
        }
    }

    async fn account_enabled(&self) -> UploadResult<bool> {
        let url = self.profile_url(ACCOUNT_CHECK_PROFILE)?;
        let (status, body) = self.send(Method::GET, url, Vec::new()).await?;
        match status {
            StatusCode::NOT_FOUND => Ok(true),
            StatusCode::FORBIDDEN => Ok(false),
            other => Err(unexpected("GetTranscodeProfile", other, body)),
        }
    }
}

fn unexpected(operation: &'static str, status: StatusCode, body: String) -> UploadError {
    UploadError::UnexpectedStatus {
        operation,
        status: status.as_u16(),
        body,
    }
}
