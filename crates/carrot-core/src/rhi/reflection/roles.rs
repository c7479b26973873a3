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

use serde::{Deserialize, Serialize};

/// What a uniform block carries, as far as the renderer is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockRole {
    /// Camera and object transforms (`model`, `view`, `projection`).
    PerFrame,
    /// Light parameters (`lightPos`, `lightColor`, `viewPos`).
    Light,
    /// Material parameters.
    Material,
}

/// How a rule matches a block name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamePattern {
    /// The block name contains this text.
    Contains(String),
    /// The block name equals this text.
    Exact(String),
}

impl NamePattern {
    /// Returns `true` if `name` matches.
    pub fn matches(&self, name: &str) -> bool {
        match self {
            NamePattern::Contains(needle) => name.contains(needle.as_str()),
            NamePattern::Exact(expected) => name == expected,
        }
    }
}

/// Assigns `role` to blocks whose name matches `pattern`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockRoleRule {
    /// The role assigned on a match.
    pub role: BlockRole,
    /// The name test.
    pub pattern: NamePattern,
}

impl BlockRoleRule {
    /// A rule matching block names that contain `needle`.
    pub fn contains(role: BlockRole, needle: &str) -> Self {
        Self {
            role,
            pattern: NamePattern::Contains(needle.to_string()),
        }
    }

    /// A rule matching one exact block name.
    pub fn exact(role: BlockRole, name: &str) -> Self {
        Self {
            role,
            pattern: NamePattern::Exact(name.to_string()),
        }
    }
}

/// An ordered rule list. The first matching rule decides a block's role.
///
/// The default recognises blocks whose names contain `PerFrame`, `Light`
/// or `Material`, tested in that order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockRoleMap {
    rules: Vec<BlockRoleRule>,
}

impl Default for BlockRoleMap {
    fn default() -> Self {
        Self {
            rules: vec![
                BlockRoleRule::contains(BlockRole::PerFrame, "PerFrame"),
                BlockRoleRule::contains(BlockRole::Light, "Light"),
                BlockRoleRule::contains(BlockRole::Material, "Material"),
            ],
        }
    }
}

impl BlockRoleMap {
    /// Creates a map from an explicit rule list.
    pub fn new(rules: Vec<BlockRoleRule>) -> Self {
        Self { rules }
    }

    /// A map that assigns no roles at all.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Returns the role of the block called `block_name`, if any rule matches.
    pub fn classify(&self, block_name: &str) -> Option<BlockRole> {
        self.rules
            .iter()
            .find(|rule| rule.pattern.matches(block_name))
            .map(|rule| rule.role)
    }

    /// The rules in evaluation order.
    pub fn rules(&self) -> &[BlockRoleRule] {
        &self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rules_classify_by_substring() {
        let roles = BlockRoleMap::default();
        assert_eq!(roles.classify("PerFrameData"), Some(BlockRole::PerFrame));
        assert_eq!(roles.classify("LightBlock"), Some(BlockRole::Light));
        assert_eq!(roles.classify("MaterialParams"), Some(BlockRole::Material));
        assert_eq!(roles.classify("Skinning"), None);
    }

    #[test]
    fn first_matching_rule_wins() {
        let roles = BlockRoleMap::default();
        // Contains both "PerFrame" and "Light"; PerFrame is tested first.
        assert_eq!(roles.classify("PerFrameLight"), Some(BlockRole::PerFrame));
        assert_eq!(roles.classify("LightMaterial"), Some(BlockRole::Light));
    }

    #[test]
    fn exact_rules() {
        let roles = BlockRoleMap::new(vec![
            BlockRoleRule::exact(BlockRole::Light, "Lights"),
            BlockRoleRule::contains(BlockRole::PerFrame, "Camera"),
        ]);
        assert_eq!(roles.classify("Lights"), Some(BlockRole::Light));
        assert_eq!(roles.classify("LightsExtra"), None);
        assert_eq!(roles.classify("CameraBlock"), Some(BlockRole::PerFrame));
        assert_eq!(BlockRoleMap::empty().classify("PerFrame"), None);
    }

    #[test]
    fn rules_round_trip_through_json() {
        let json = r#"[{"role":"Light","pattern":{"Exact":"Sun"}}]"#;
        let roles: BlockRoleMap = serde_json::from_str(json).unwrap();
        assert_eq!(roles.classify("Sun"), Some(BlockRole::Light));
        assert_eq!(serde_json::to_string(&roles).unwrap(), json);
    }
}
