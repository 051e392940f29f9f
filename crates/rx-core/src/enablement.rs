//! Feature enablement: the global map and the sparse per-device matrix

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::device_id::DeviceId;

/// featureId -> enabled
///
/// Captured once per reconciliation (one for the *current* registry view, one for
/// the *target* configuration) and never mutated afterwards. Lookups return
/// `None` for features the map does not mention so callers can apply the
/// feature's own default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureEnablementMap(BTreeMap<String, bool>);

impl FeatureEnablementMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, used while capturing a map
    pub fn with(mut self, feature_id: impl Into<String>, enabled: bool) -> Self {
        self.0.insert(feature_id.into(), enabled);
        self
    }

    /// Explicit setting for a feature, if any
    pub fn get(&self, feature_id: &str) -> Option<bool> {
        self.0.get(feature_id).copied()
    }

    /// Setting for a feature, falling back to `default` when unmentioned
    pub fn is_enabled_or(&self, feature_id: &str, default: bool) -> bool {
        self.get(feature_id).unwrap_or(default)
    }

    /// Features explicitly switched on
    pub fn enabled_features(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(id, _)| id.as_str())
    }

    /// Every explicit setting, in feature id order
    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0.iter().map(|(id, enabled)| (id.as_str(), *enabled))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, bool)> for FeatureEnablementMap {
    fn from_iter<I: IntoIterator<Item = (K, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// deviceId -> (featureId -> enabled), sparse
///
/// Absence of a pair means disabled, so [`disable`](Self::disable) removes the
/// pair instead of storing `false`. Queries are side-effect free.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceFeatureMatrix(BTreeMap<DeviceId, BTreeMap<String, bool>>);

impl DeviceFeatureMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable a feature for a device
    pub fn enable(&mut self, device_id: &DeviceId, feature_id: &str) {
        self.0
            .entry(device_id.clone())
            .or_default()
            .insert(feature_id.to_string(), true);
    }

    /// Disable a feature for a device
    pub fn disable(&mut self, device_id: &DeviceId, feature_id: &str) {
        if let Some(features) = self.0.get_mut(device_id) {
            features.remove(feature_id);
            if features.is_empty() {
                self.0.remove(device_id);
            }
        }
    }

    pub fn is_enabled(&self, device_id: &DeviceId, feature_id: &str) -> bool {
        self.0
            .get(device_id)
            .and_then(|features| features.get(feature_id))
            .copied()
            .unwrap_or(false)
    }

    /// Devices with the feature enabled, in device order
    pub fn devices_for_feature(&self, feature_id: &str) -> Vec<DeviceId> {
        self.0
            .iter()
            .filter(|(_, features)| features.get(feature_id).copied().unwrap_or(false))
            .map(|(device, _)| device.clone())
            .collect()
    }

    /// Every enabled (device, feature) pair
    pub fn all_enabled_pairs(&self) -> BTreeSet<(DeviceId, String)> {
        self.0
            .iter()
            .flat_map(|(device, features)| {
                features
                    .iter()
                    .filter(|(_, enabled)| **enabled)
                    .map(move |(feature, _)| (device.clone(), feature.clone()))
            })
            .collect()
    }

    /// Build from configuration lists of `device -> [features]`
    pub fn from_lists<D, F>(lists: impl IntoIterator<Item = (D, Vec<F>)>) -> Self
    where
        D: Into<DeviceId>,
        F: AsRef<str>,
    {
        let mut matrix = Self::new();
        for (device, features) in lists {
            let device = device.into();
            for feature in features {
                matrix.enable(&device, feature.as_ref());
            }
        }
        matrix
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
