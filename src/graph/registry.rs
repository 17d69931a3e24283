use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{DEFAULT_PALETTE, MAX_CENTER_EXTENT, RegistryConfig};
use crate::math::{Vec3, point, vec3};

/// Visual identity of one system: a palette color and an anchor point, both
/// fixed at first sighting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SystemRecord {
    pub name: String,
    pub color: String,
    #[serde(with = "point")]
    pub center: Vec3,
}

pub struct SystemRegistry {
    records: Vec<SystemRecord>,
    index_by_name: HashMap<String, usize>,
    palette: Vec<String>,
    center_extent: f32,
    rng: StdRng,
}

impl SystemRegistry {
    pub fn new(config: &RegistryConfig) -> Self {
        let palette = if config.palette.is_empty() {
            DEFAULT_PALETTE.iter().map(|color| (*color).to_owned()).collect()
        } else {
            config.palette.clone()
        };
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let center_extent = if config.center_extent.is_finite() {
            config.center_extent.abs().min(MAX_CENTER_EXTENT)
        } else {
            let fallback = RegistryConfig::default().center_extent;
            warn!(
                extent = config.center_extent,
                fallback, "center extent is not finite, using the default"
            );
            fallback
        };

        Self {
            records: Vec::new(),
            index_by_name: HashMap::new(),
            palette,
            center_extent,
            rng,
        }
    }

    pub fn register_if_absent(&mut self, name: &str) -> &SystemRecord {
        if let Some(&index) = self.index_by_name.get(name) {
            return &self.records[index];
        }

        let color = self.palette[self.records.len() % self.palette.len()].clone();
        let extent = self.center_extent;
        let center = vec3(
            self.rng.gen_range(-extent..=extent),
            self.rng.gen_range(-extent..=extent),
            self.rng.gen_range(-extent..=extent),
        );
        debug!(system = name, %color, ?center, "registered system");

        self.push(SystemRecord {
            name: name.to_owned(),
            color,
            center,
        })
    }

    /// Inserts a record with a known color and center, replacing any record of
    /// the same name. Used when loading a saved graph.
    pub fn restore(&mut self, record: SystemRecord) {
        if let Some(&index) = self.index_by_name.get(&record.name) {
            self.records[index] = record;
        } else {
            self.push(record);
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<SystemRecord> {
        let index = self.index_by_name.remove(name)?;
        let removed = self.records.remove(index);
        for record in &self.records[index..] {
            if let Some(slot) = self.index_by_name.get_mut(&record.name) {
                *slot -= 1;
            }
        }
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.index_by_name.clear();
    }

    pub fn get(&self, name: &str) -> Option<&SystemRecord> {
        self.index_by_name
            .get(name)
            .map(|&index| &self.records[index])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_by_name.contains_key(name)
    }

    /// Records in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &SystemRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn push(&mut self, record: SystemRecord) -> &SystemRecord {
        let index = self.records.len();
        self.index_by_name.insert(record.name.clone(), index);
        self.records.push(record);
        &self.records[index]
    }
}
