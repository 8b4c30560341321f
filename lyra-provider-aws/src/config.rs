//! Provider configuration
//!
//! Read from the manifest's `provider` block. Anything left unset falls back
//! to the SDK's default chain (environment, shared config, IMDS).

use aws_config::{BehaviorVersion, Region, SdkConfig};
use lyra_core::resource::Value;
use serde::{Deserialize, Serialize};

use crate::schemas::types;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Custom endpoint, e.g. a local emulator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
    /// Named profile from the shared config files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
}

impl ProviderConfig {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(region) = &self.region {
            types::aws_region()
                .validate(&Value::String(region.clone()))
                .map_err(|e| format!("provider.region: {}", e))?;
        }
        if let Some(url) = &self.endpoint_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            return Err(format!(
                "provider.endpoint_url: expected an http(s) URL, got '{}'",
                url
            ));
        }
        Ok(())
    }

    /// Load the shared SDK configuration
    pub async fn load_sdk_config(&self) -> SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &self.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(profile) = &self.profile {
            loader = loader.profile_name(profile);
        }
        if let Some(url) = &self.endpoint_url {
            loader = loader.endpoint_url(url);
        }
        loader.load().await
    }
}
