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

//! Uniform name normalisation and lookup.

use std::collections::BTreeMap;

/// Returns `name` without its first `[...]` suffix.
///
/// `"lights[0].color"` becomes `"lights"`, `"bones[3]"` becomes `"bones"`.
pub fn strip_array_suffix(name: &str) -> &str {
    match name.find('[') {
        Some(idx) => &name[..idx],
        None => name,
    }
}

/// The keys a block member is cached under, most specific first, without duplicates.
///
/// * the full decorated name (`Light.lightPos`),
/// * the name with its array suffix stripped (`bones[0]` -> `bones`),
/// * the segment after the last `.`, with its own array suffix stripped
///   (`Light.lightPos` -> `lightPos`, `Scene.lights[0].color` -> `color`).
pub fn cache_keys(name: &str) -> Vec<&str> {
    let mut keys = vec![name];

    let stripped = strip_array_suffix(name);
    if stripped != name && !stripped.is_empty() {
        keys.push(stripped);
    }

    if let Some(dot) = name.rfind('.') {
        let short = strip_array_suffix(&name[dot + 1..]);
        if !short.is_empty() && !keys.contains(&short) {
            keys.push(short);
        }
    }

    keys
}

/// Finds the entry for `field` in a name-keyed map.
///
/// Tiers, first hit in key order wins within a tier:
/// 1. the exact key,
/// 2. a key ending with `".<field>"` (strictly longer than the suffix),
/// 3. any key ending with `<field>`.
///
/// Entries for which `filter` returns `false` are skipped in every tier.
pub fn resolve_uniform<'m, V, F>(
    field: &str,
    map: &'m BTreeMap<String, V>,
    mut filter: F,
) -> Option<(&'m str, &'m V)>
where
    F: FnMut(&V) -> bool,
{
    if field.is_empty() {
        return None;
    }

    if let Some((key, value)) = map.get_key_value(field) {
        if filter(value) {
            return Some((key.as_str(), value));
        }
    }

    let dotted = format!(".{field}");
    let by_dot = map
        .iter()
        .find(|(key, value)| key.len() > dotted.len() && key.ends_with(&dotted) && filter(value));
    if let Some((key, value)) = by_dot {
        return Some((key.as_str(), value));
    }

    map.iter()
        .find(|(key, value)| key.ends_with(field) && filter(value))
        .map(|(key, value)| (key.as_str(), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, u32)]) -> BTreeMap<String, u32> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn keys_for_block_member() {
        assert_eq!(cache_keys("Light.lightPos"), vec!["Light.lightPos", "lightPos"]);
    }

    #[test]
    fn keys_for_array_member() {
        assert_eq!(
            cache_keys("Scene.lights[0].color"),
            vec!["Scene.lights[0].color", "Scene.lights", "color"]
        );
        assert_eq!(cache_keys("bones[0]"), vec!["bones[0]", "bones"]);
        assert_eq!(cache_keys("Skin.bones[0]"), vec!["Skin.bones[0]", "Skin.bones", "bones"]);
    }

    #[test]
    fn keys_for_plain_name() {
        assert_eq!(cache_keys("model"), vec!["model"]);
    }

    #[test]
    fn exact_match_wins() {
        let vars = map(&[("PerFrame.view", 64), ("view", 64), ("Shadow.view", 0)]);
        let (key, offset) = resolve_uniform("view", &vars, |_| true).unwrap();
        assert_eq!(key, "view");
        assert_eq!(*offset, 64);
    }

    #[test]
    fn dotted_suffix_before_plain_suffix() {
        let vars = map(&[("Light.baseColor", 0), ("Material.color", 16)]);
        let (key, offset) = resolve_uniform("color", &vars, |_| true).unwrap();
        assert_eq!(key, "Material.color");
        assert_eq!(*offset, 16);
    }

    #[test]
    fn plain_suffix_is_last_resort() {
        let vars = map(&[("Light.baseColor", 32)]);
        let (key, _) = resolve_uniform("Color", &vars, |_| true).unwrap();
        assert_eq!(key, "Light.baseColor");
    }

    #[test]
    fn dotted_suffix_must_be_strictly_longer() {
        let vars = map(&[(".x", 4)]);
        // ".x" only matches through the plain suffix tier.
        assert_eq!(resolve_uniform("x", &vars, |_| true), Some((".x", &4)));
    }

    #[test]
    fn filter_skips_entries_in_every_tier() {
        let vars = map(&[("lightPos", 0), ("Light.lightPos", 0), ("Other.lightPos", 1)]);
        let (key, value) = resolve_uniform("lightPos", &vars, |v| *v == 1).unwrap();
        assert_eq!(key, "Other.lightPos");
        assert_eq!(*value, 1);
    }

    #[test]
    fn miss_returns_none() {
        let vars = map(&[("PerFrame.model", 0)]);
        assert!(resolve_uniform("roughness", &vars, |_| true).is_none());
        assert!(resolve_uniform("", &vars, |_| true).is_none());
    }
}
