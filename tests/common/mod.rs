//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use lore_galaxy::{AnalysisBatch, BatchLink, BatchNode, EngineConfig, RegistryConfig, Session};

pub fn seeded_session(seed: u64) -> Session {
    Session::new(EngineConfig {
        registry: RegistryConfig {
            seed: Some(seed),
            ..RegistryConfig::default()
        },
        ..EngineConfig::default()
    })
}

pub fn batch(nodes: &[(&str, &str, f64)], links: &[(&str, &str, &str)]) -> AnalysisBatch {
    AnalysisBatch {
        nodes: nodes
            .iter()
            .map(|&(id, system, weight)| BatchNode::new(id, system, weight))
            .collect(),
        links: links
            .iter()
            .map(|&(source, target, label)| BatchLink::new(source, target, label))
            .collect(),
    }
}

pub fn sorted(values: &[String]) -> Vec<String> {
    let mut values = values.to_vec();
    values.sort();
    values
}
