//! Wiring: config → ledger, store, dispatchers, scheduler, agents → loops.

use crate::combat_log::CombatLog;
use crate::config::{StartFrom, VigilConfig};
use crate::error::VigilError;
use crate::tick::{LoopExit, LoopHandle, TickLoop};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use vigil_agent::{
    AgentConfig, ChatDecision, CycleTrigger, DecisionLoop, HeuristicDecision, LedgerView,
    TargetTracker,
};
use vigil_core::{
    Clock, Cursor, DecisionFn, EventFilter, Ledger, Signer, StateStore, StreamId, SystemClock,
};
use vigil_dispatch::{CursorStore, Dispatcher, DispatcherConfig, HandlerRegistry, LedgerSource};
use vigil_exec::LedgerExecutor;
use vigil_schedule::{Backoff, COMBAT_EVENT, RespawnTrigger, Scheduler};
use vigil_state_fs::FsStore;
use vigil_state_memory::MemoryStore;
use vigil_sui::{KeytoolSigner, SuiClient};

/// Which process to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Log every battle event.
    Index,
    /// Respawn killed bosses.
    Oracle,
    /// Run the configured agents.
    Agent,
}

impl FromStr for Mode {
    type Err = VigilError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "index" => Ok(Mode::Index),
            "oracle" => Ok(Mode::Oracle),
            "agent" => Ok(Mode::Agent),
            other => Err(VigilError::Config(format!("unknown subcommand: {other}"))),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Index => "index",
            Mode::Oracle => "oracle",
            Mode::Agent => "agent",
        })
    }
}

/// Shared collaborators every mode is built from.
#[derive(Clone)]
pub struct Services {
    /// The ledger.
    pub ledger: Arc<dyn Ledger>,
    /// Cursor, dedup and schedule persistence.
    pub store: Arc<dyn StateStore>,
    /// Wall clock.
    pub clock: Arc<dyn Clock>,
}

impl Services {
    /// Connect to the configured node and open the configured store.
    pub async fn connect(config: &VigilConfig) -> Result<Self, VigilError> {
        let client = SuiClient::with_client(
            config.rpc_url.clone(),
            reqwest::Client::new(),
            config.call_timeout,
        )
        .gas_budget(config.layout.gas_budget);
        Ok(Self {
            ledger: Arc::new(client),
            store: open_store(config).await?,
            clock: Arc::new(SystemClock),
        })
    }
}

/// A filesystem store under `state_dir`, or memory when unset.
pub async fn open_store(config: &VigilConfig) -> Result<Arc<dyn StateStore>, VigilError> {
    match &config.state_dir {
        Some(dir) => {
            let store = FsStore::open(dir).await?;
            tracing::info!(state_dir = %dir.display(), "using filesystem state");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("no state_dir configured, state is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// A signer backed by the `sui` CLI for `address`.
pub fn keytool_signer(config: &VigilConfig, address: &str) -> Arc<dyn Signer> {
    let mut signer = KeytoolSigner::new(address)
        .program(config.keytool.program.clone())
        .timeout(config.keytool.timeout);
    if let Some(keystore) = &config.keytool.keystore {
        signer = signer.keystore(keystore.clone());
    }
    Arc::new(signer)
}

/// Open a dispatcher for `stream`, starting a fresh stream where
/// `start_from` says. A stream with a persisted cursor resumes from it
/// without asking the node anything.
pub async fn open_dispatcher(
    config: &VigilConfig,
    services: &Services,
    stream: impl Into<StreamId>,
    filter: EventFilter,
    registry: HandlerRegistry,
) -> Result<Arc<Dispatcher>, VigilError> {
    let source = LedgerSource::new(Arc::clone(&services.ledger))
        .with_page_limit(config.page_limit)
        .with_max_pages(config.max_pages_per_tick);

    let stream = stream.into();
    let resumed = CursorStore::persisted(services.store.as_ref(), &stream)
        .await?
        .is_some();
    let start = match config.start_from {
        StartFrom::Latest if !resumed => Cursor {
            position: source.latest_position(&filter).await?,
            watermark_ms: 0,
        },
        _ => Cursor::default(),
    };

    let mut dispatcher_config = DispatcherConfig::new(stream, filter);
    dispatcher_config.dedup_capacity = config.dedup_capacity;
    dispatcher_config.late_window = config.late_window;
    dispatcher_config.start = start;

    let dispatcher = Dispatcher::open(
        dispatcher_config,
        Arc::new(source),
        registry,
        Arc::clone(&services.store),
    )
    .await?
    .with_clock(Arc::clone(&services.clock));
    Ok(Arc::new(dispatcher))
}

fn dispatch_loop(name: String, config: &VigilConfig, dispatcher: Arc<Dispatcher>) -> LoopHandle {
    TickLoop::new(name, config.poll_interval).spawn(move || {
        let dispatcher = Arc::clone(&dispatcher);
        async move {
            dispatcher.tick().await?;
            Ok(())
        }
    })
}

/// The indexer: one dispatcher over every event of the module.
pub async fn build_indexer(
    config: &VigilConfig,
    services: &Services,
) -> Result<Arc<Dispatcher>, VigilError> {
    let filter = EventFilter::module(config.package_id.clone(), config.module.clone());
    let registry = HandlerRegistry::new().with(Arc::new(CombatLog::new()));
    open_dispatcher(config, services, "indexer", filter, registry).await
}

/// The respawn oracle's two halves.
pub struct Oracle {
    /// Watches kill events.
    pub dispatcher: Arc<Dispatcher>,
    /// Executes due respawns.
    pub scheduler: Arc<Scheduler>,
}

/// Build the oracle signing with `signer`.
pub async fn build_oracle(
    config: &VigilConfig,
    services: &Services,
    signer: Arc<dyn Signer>,
) -> Result<Oracle, VigilError> {
    if config.layout.admin_cap_id.is_none() {
        return Err(VigilError::Config(
            "oracle needs layout.admin_cap_id".into(),
        ));
    }
    let executor = LedgerExecutor::new(
        Arc::clone(&services.ledger),
        signer,
        config.contract_layout(),
    )?;
    let scheduler = Arc::new(
        Scheduler::open_with_clock(
            Arc::new(executor),
            Arc::clone(&services.store),
            Backoff::exponential(config.retry_base_delay, config.retry_max_delay),
            Arc::clone(&services.clock),
        )
        .await?
        .with_confirm_limit(config.confirm_limit),
    );
    let trigger = RespawnTrigger::new(Arc::clone(&scheduler))
        .with_delay(config.respawn_delay)
        .with_ledger(Arc::clone(&services.ledger));
    let filter = EventFilter::event_type(
        config.package_id.clone(),
        config.module.clone(),
        COMBAT_EVENT,
    );
    let dispatcher = open_dispatcher(
        config,
        services,
        "oracle",
        filter,
        HandlerRegistry::new().with(Arc::new(trigger)),
    )
    .await?;
    Ok(Oracle {
        dispatcher,
        scheduler,
    })
}

/// One running agent's parts.
pub struct AgentParts {
    /// The decision loop.
    pub decision_loop: Arc<DecisionLoop>,
    /// The agent's event stream.
    pub dispatcher: Arc<Dispatcher>,
}

/// The decision function for `agent`: the chat endpoint when one is
/// configured, the heuristic otherwise.
pub fn decision_for(config: &VigilConfig, agent: &AgentConfig) -> Arc<dyn DecisionFn> {
    match &config.chat.url {
        Some(url) => {
            let mut chat = ChatDecision::new(url.clone())
                .api_key(config.chat.api_key())
                .identity(agent.identity.clone())
                .strategy_prompt(agent.strategy_prompt.clone());
            if let Some(model) = &config.chat.model {
                chat = chat.model(model.clone());
            }
            if !chat.is_configured() {
                tracing::warn!(
                    agent = %agent.name,
                    api_key_env = %config.chat.api_key_env,
                    "chat endpoint lacks a model or key, every cycle will use the heuristic"
                );
            }
            Arc::new(chat)
        }
        None => Arc::new(HeuristicDecision),
    }
}

/// Build one agent signing with `signer` and deciding with `decision`.
pub async fn build_agent(
    config: &VigilConfig,
    agent: &AgentConfig,
    services: &Services,
    signer: Arc<dyn Signer>,
    decision: Arc<dyn DecisionFn>,
) -> Result<AgentParts, VigilError> {
    agent.validate()?;
    if config.layout.arena_id.is_none() {
        return Err(VigilError::Config("agents need layout.arena_id".into()));
    }
    let executor = LedgerExecutor::new(
        Arc::clone(&services.ledger),
        signer,
        config.contract_layout(),
    )?;
    let view = Arc::new(LedgerView::new(
        Arc::clone(&services.ledger),
        agent.address.clone(),
        agent.targets.clone(),
    ));
    let decision_loop = Arc::new(DecisionLoop::new(
        agent.clone(),
        Arc::clone(&view),
        decision,
        Arc::new(executor),
    ));
    let registry = HandlerRegistry::new()
        .with(Arc::new(TargetTracker::new(view)))
        .with(Arc::new(CycleTrigger::new(Arc::clone(&decision_loop))));
    let filter = EventFilter::module(config.package_id.clone(), config.module.clone());
    let dispatcher = open_dispatcher(
        config,
        services,
        format!("agent:{}", agent.name),
        filter,
        registry,
    )
    .await?;
    Ok(AgentParts {
        decision_loop,
        dispatcher,
    })
}

/// All loops of one process.
pub struct Runtime {
    loops: Vec<LoopHandle>,
}

impl Runtime {
    /// Build `mode` from `config` and start its loops.
    pub async fn start(mode: Mode, config: &VigilConfig) -> Result<Self, VigilError> {
        let services = Services::connect(config).await?;
        Self::start_with(mode, config, &services).await
    }

    /// Like [`start`](Self::start) over explicit services. Signers are
    /// still the keytool.
    pub async fn start_with(
        mode: Mode,
        config: &VigilConfig,
        services: &Services,
    ) -> Result<Self, VigilError> {
        let mut loops = Vec::new();
        match mode {
            Mode::Index => {
                let dispatcher = build_indexer(config, services).await?;
                loops.push(dispatch_loop("indexer".into(), config, dispatcher));
            }
            Mode::Oracle => {
                let address = config.oracle.signer_address.as_deref().ok_or_else(|| {
                    VigilError::Config("oracle needs oracle.signer_address".into())
                })?;
                let oracle =
                    build_oracle(config, services, keytool_signer(config, address)).await?;
                loops.push(dispatch_loop("oracle".into(), config, oracle.dispatcher));
                let scheduler = oracle.scheduler;
                loops.push(
                    TickLoop::new("scheduler", config.scheduler_interval).spawn(move || {
                        let scheduler = Arc::clone(&scheduler);
                        async move {
                            let report = scheduler.tick().await;
                            if report.attempted > 0 {
                                tracing::info!(
                                    attempted = report.attempted,
                                    succeeded = report.succeeded,
                                    failed = report.failed,
                                    pending = report.pending,
                                    "scheduler tick"
                                );
                            }
                            Ok(())
                        }
                    }),
                );
            }
            Mode::Agent => {
                if config.agents.is_empty() {
                    return Err(VigilError::Config("no agents configured".into()));
                }
                for agent in &config.agents {
                    let parts = build_agent(
                        config,
                        agent,
                        services,
                        keytool_signer(config, &agent.address),
                        decision_for(config, agent),
                    )
                    .await?;
                    parts.decision_loop.register().await?;
                    loops.push(dispatch_loop(
                        format!("agent:{}", agent.name),
                        config,
                        parts.dispatcher,
                    ));
                    let decision_loop = parts.decision_loop;
                    loops.push(
                        TickLoop::new(format!("heartbeat:{}", agent.name), agent.heartbeat)
                            .spawn(move || {
                                let decision_loop = Arc::clone(&decision_loop);
                                async move {
                                    decision_loop.run_cycle("heartbeat").await?;
                                    Ok(())
                                }
                            }),
                    );
                }
            }
        }
        tracing::info!(mode = %mode, loops = loops.len(), "runtime started");
        Ok(Self { loops })
    }

    /// Names of the running loops.
    pub fn loop_names(&self) -> Vec<&str> {
        self.loops.iter().map(LoopHandle::name).collect()
    }

    /// Run until Ctrl-C or until any loop halts, then stop every loop.
    ///
    /// Returns an error naming the first loop that halted.
    pub async fn run_until_shutdown(self) -> Result<(), VigilError> {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        let mut poll = tokio::time::interval(std::time::Duration::from_millis(500));
        loop {
            tokio::select! {
                signal = &mut ctrl_c => {
                    signal?;
                    tracing::info!("interrupt received, shutting down");
                    break;
                }
                _ = poll.tick() => {
                    if self.loops.iter().any(LoopHandle::is_finished) {
                        break;
                    }
                }
            }
        }
        let mut halted = None;
        for (name, exit) in self.shutdown().await {
            if let LoopExit::Halted(reason) = exit {
                if halted.is_none() {
                    halted = Some(VigilError::Halted { name, reason });
                }
            }
        }
        match halted {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Stop every loop and report how each ended.
    pub async fn shutdown(self) -> Vec<(String, LoopExit)> {
        let mut exits = Vec::with_capacity(self.loops.len());
        for handle in self.loops {
            let name = handle.name().to_owned();
            exits.push((name, handle.stop().await));
        }
        exits
    }
}
