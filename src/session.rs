use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::cluster::ClusterForce;
use crate::config::EngineConfig;
use crate::error::{GalaxyError, GalaxyResult};
use crate::graph::{
    AnalysisBatch, GraphSnapshot, GraphStore, MergeReport, NodeRecord, ParsedBatch, PruneReport,
    ReplaceReport, SearchHit, SystemMeta, SystemRegistry,
};
use crate::shell::{Shell, ShellProjector};
use crate::sim::{GraphView, Simulation};

/// A session shared with other threads. Every mutation happens under the lock,
/// so a tick never sees a half-applied prune or replace.
pub type SharedSession = Arc<Mutex<Session>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FetchTicket(u64);

#[derive(Debug)]
pub enum FetchOutcome {
    Merged {
        ticket: FetchTicket,
        report: MergeReport,
    },
    Failed {
        ticket: FetchTicket,
        error: GalaxyError,
    },
}

type FetchMessage = (FetchTicket, GalaxyResult<ParsedBatch>);

/// Owns the graph, the system registry and the simulation host, and is the
/// only place they are mutated.
pub struct Session {
    config: EngineConfig,
    store: GraphStore,
    registry: SystemRegistry,
    simulation: Simulation,
    shells: ShellProjector,
    fetch_tx: Sender<FetchMessage>,
    fetch_rx: Receiver<FetchMessage>,
    next_ticket: u64,
    in_flight: usize,
}

impl Session {
    pub fn new(config: EngineConfig) -> Self {
        let mut simulation = Simulation::new(config.physics);
        simulation.register_force(
            ClusterForce::NAME,
            Box::new(ClusterForce::new(config.cluster.strength)),
        );
        let (fetch_tx, fetch_rx) = mpsc::channel();

        Self {
            store: GraphStore::new(),
            registry: SystemRegistry::new(&config.registry),
            shells: ShellProjector::new(&config.shell),
            simulation,
            fetch_tx,
            fetch_rx,
            next_ticket: 0,
            in_flight: 0,
            config,
        }
    }

    pub fn into_shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn registry(&self) -> &SystemRegistry {
        &self.registry
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    pub fn simulation_mut(&mut self) -> &mut Simulation {
        &mut self.simulation
    }

    pub fn merge(&mut self, batch: &AnalysisBatch) -> MergeReport {
        let report = self.store.merge(batch, &mut self.registry);
        if report.changed() {
            self.simulation.sync(&self.store);
        }
        info!(
            nodes = self.store.node_count(),
            links = self.store.edge_count(),
            systems = self.registry.len(),
            "merged batch into session"
        );
        report
    }

    /// Merges a decoded batch, reporting entries lost during decoding ahead
    /// of those rejected by the merge itself.
    pub fn merge_parsed(&mut self, parsed: ParsedBatch) -> MergeReport {
        let mut report = self.merge(&parsed.batch);
        if !parsed.rejected.is_empty() {
            let mut rejected = parsed.rejected;
            rejected.append(&mut report.rejected);
            report.rejected = rejected;
        }
        report
    }

    pub fn prune_system(&mut self, system: &str) -> PruneReport {
        let report = self.store.prune_system(system, &mut self.registry);
        self.simulation.sync(&self.store);
        report
    }

    /// Empties graph, registry and bodies together.
    pub fn purge(&mut self) {
        self.store.clear();
        self.registry.clear();
        self.simulation.clear();
        info!("purged session");
    }

    /// Loads a saved graph in place of the current one, restoring system
    /// identities and any saved positions.
    pub fn replace(&mut self, snapshot: GraphSnapshot) -> ReplaceReport {
        let mut nodes = Vec::with_capacity(snapshot.nodes.len());
        let mut positions = Vec::new();
        let mut claimed = HashSet::new();
        for record in snapshot.nodes {
            let (node, position) = record.into_node();
            // The store keeps the first storable record of each id.
            if node.is_storable()
                && claimed.insert(node.id.clone())
                && let Some(position) = position
            {
                positions.push((node.id.clone(), position));
            }
            nodes.push(node);
        }

        let report = self.store.replace(nodes, snapshot.links);

        self.registry.clear();
        for (name, meta) in snapshot.system_meta {
            self.registry.restore(meta.into_record(name));
        }
        for node in self.store.nodes() {
            for system in &node.systems {
                if !self.registry.contains(system) {
                    self.registry.register_if_absent(system);
                }
            }
        }

        self.simulation.sync(&self.store);
        for (id, position) in positions {
            self.simulation.place(&id, position);
        }

        info!(
            nodes = report.nodes,
            links = report.links,
            systems = self.registry.len(),
            "replaced graph"
        );
        report
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self
                .store
                .nodes()
                .iter()
                .map(|node| {
                    let position = self.simulation.body(&node.id).map(|body| body.position);
                    NodeRecord::from_node(node, position)
                })
                .collect(),
            links: self.store.edges().iter().map(Into::into).collect(),
            system_meta: self
                .registry
                .iter()
                .map(|record| (record.name.clone(), SystemMeta::from(record)))
                .collect(),
        }
    }

    pub fn shells(&self) -> Vec<Shell> {
        self.shells.compute(&self.store, &self.registry)
    }

    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        self.store.search(query, limit)
    }

    pub fn tick(&mut self) -> bool {
        let view = GraphView {
            store: &self.store,
            registry: &self.registry,
        };
        self.simulation.tick(&view)
    }

    /// Ticks until the layout cools or `max_ticks` is reached. Returns the
    /// number of ticks run.
    pub fn run(&mut self, max_ticks: usize) -> usize {
        let mut ticks = 0;
        while ticks < max_ticks {
            ticks += 1;
            if !self.tick() {
                break;
            }
        }
        ticks
    }

    /// Runs `fetch` on a worker thread. Its batch is merged by a later
    /// [`Session::poll_fetches`] call, whole or not at all.
    pub fn spawn_fetch<F>(&mut self, fetch: F) -> FetchTicket
    where
        F: FnOnce() -> GalaxyResult<ParsedBatch> + Send + 'static,
    {
        let ticket = FetchTicket(self.next_ticket);
        self.next_ticket += 1;
        self.in_flight += 1;

        let tx = self.fetch_tx.clone();
        thread::spawn(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(fetch)).unwrap_or_else(|_| {
                Err(GalaxyError::Fetch("fetch worker panicked".to_owned()))
            });
            let _ = tx.send((ticket, result));
        });

        ticket
    }

    pub fn pending_fetches(&self) -> usize {
        self.in_flight
    }

    /// Applies every fetch that has finished, in completion order.
    pub fn poll_fetches(&mut self) -> Vec<FetchOutcome> {
        let mut outcomes = Vec::new();
        loop {
            match self.fetch_rx.try_recv() {
                Ok(message) => outcomes.push(self.apply_fetch(message)),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        outcomes
    }

    /// Blocks until every in-flight fetch has finished or `timeout` passes
    /// without one finishing.
    pub fn wait_for_fetches(&mut self, timeout: Duration) -> Vec<FetchOutcome> {
        let mut outcomes = Vec::new();
        while self.in_flight > 0 {
            match self.fetch_rx.recv_timeout(timeout) {
                Ok(message) => outcomes.push(self.apply_fetch(message)),
                Err(RecvTimeoutError::Timeout) => {
                    warn!(pending = self.in_flight, "timed out waiting for fetches");
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        outcomes
    }

    fn apply_fetch(&mut self, (ticket, result): FetchMessage) -> FetchOutcome {
        self.in_flight = self.in_flight.saturating_sub(1);
        match result {
            Ok(parsed) => FetchOutcome::Merged {
                ticket,
                report: self.merge_parsed(parsed),
            },
            Err(error) => {
                warn!(?ticket, %error, "fetch failed");
                FetchOutcome::Failed { ticket, error }
            }
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
