// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Settings for the render hardware interface.

use super::reflection::BlockRoleMap;
use serde::{Deserialize, Serialize};

/// Tunables shared by every backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RhiSettings {
    /// How uniform blocks are mapped to renderer roles, first match wins.
    pub block_roles: BlockRoleMap,
    /// If `true`, every program's uniform cache is dumped after linking.
    pub log_reflection: bool,
    /// Maximum number of bytes kept from a compiler or linker info log.
    pub info_log_limit: usize,
}

impl Default for RhiSettings {
    fn default() -> Self {
        Self {
            block_roles: BlockRoleMap::default(),
            log_reflection: false,
            info_log_limit: 4096,
        }
    }
}

impl RhiSettings {
    /// Parses settings from JSON. Missing fields keep their defaults.
    /// ## Errors
    /// Returns the `serde_json` error if the text is not a valid settings object.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Truncates `log` to [`RhiSettings::info_log_limit`] bytes on a char boundary.
    pub fn clamp_info_log(&self, mut log: String) -> String {
        if log.len() > self.info_log_limit {
            let mut cut = self.info_log_limit;
            while !log.is_char_boundary(cut) {
                cut -= 1;
            }
            log.truncate(cut);
        }
        log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rhi::reflection::BlockRole;

    #[test]
    fn empty_json_gives_defaults() {
        let settings = RhiSettings::from_json_str("{}").unwrap();
        assert_eq!(settings, RhiSettings::default());
    }

    #[test]
    fn custom_roles_from_json() {
        let json = r#"{
            "block_roles": [
                {"role": "PerFrame", "pattern": {"Exact": "Camera"}},
                {"role": "Material", "pattern": {"Contains": "Surface"}}
            ],
            "log_reflection": true
        }"#;
        let settings = RhiSettings::from_json_str(json).unwrap();
        assert!(settings.log_reflection);
        assert_eq!(settings.info_log_limit, 4096);
        assert_eq!(settings.block_roles.classify("Camera"), Some(BlockRole::PerFrame));
        assert_eq!(settings.block_roles.classify("SurfaceParams"), Some(BlockRole::Material));
        assert_eq!(settings.block_roles.classify("PerFrame"), None);
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(RhiSettings::from_json_str("{\"log_reflection\": 3}").is_err());
    }

    #[test]
    fn info_log_is_clamped() {
        let settings = RhiSettings {
            info_log_limit: 4,
            ..Default::default()
        };
        assert_eq!(settings.clamp_info_log("error: bad".to_string()), "erro");
        assert_eq!(settings.clamp_info_log("ok".to_string()), "ok");
        assert_eq!(settings.clamp_info_log("abcé".to_string()), "abc");
    }
}
