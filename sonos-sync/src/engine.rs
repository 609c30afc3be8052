//! SyncEngine - the context object owning every registry and store
//!
//! The engine is cheap to clone; clones share the same household state.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use sonos_api::{DeviceProxy, EventSink, EventSubscription, Service, SpeakerId};
use sonos_state::{
    ConvergenceWaiter, DeviceState, EventActivity, GroupViewCache, Reconciler, StateChange,
    StateError, StateStore, TopologyLock, TopologyStore,
};

use crate::snapshot::Snapshot;
use crate::view::DeviceView;
use crate::worker::WorkerPool;
use crate::{EngineConfig, Result, SyncError};

/// Event plumbing of one registered speaker
pub(crate) struct DeviceRuntime {
    pub(crate) subscriptions: Mutex<Vec<Box<dyn EventSubscription>>>,
    pub(crate) activity: EventActivity,
    pub(crate) sink: EventSink,
    dispatcher: JoinHandle<()>,
}

pub(crate) struct EngineInner {
    pub(crate) config: EngineConfig,
    pub(crate) proxy: Arc<dyn DeviceProxy>,
    pub(crate) pool: WorkerPool,
    pub(crate) states: StateStore,
    pub(crate) topology: Arc<TopologyStore>,
    pub(crate) group_views: Arc<GroupViewCache>,
    pub(crate) lock: TopologyLock,
    pub(crate) waiter: ConvergenceWaiter,
    pub(crate) reconciler: Reconciler,
    pub(crate) devices: DashMap<SpeakerId, DeviceRuntime>,
    pub(crate) snapshots: Mutex<HashMap<SpeakerId, Snapshot>>,
    pub(crate) refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl EngineInner {
    /// Run a proxy call on the worker pool
    pub(crate) async fn call<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn DeviceProxy) -> sonos_api::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let proxy = Arc::clone(&self.proxy);
        self.pool.run(move || f(proxy.as_ref())).await?.map_err(SyncError::from)
    }

    pub(crate) fn require(&self, speaker: &SpeakerId) -> Result<DeviceState> {
        self.states
            .get(speaker)
            .ok_or_else(|| SyncError::SpeakerNotFound(speaker.clone()))
    }

    pub(crate) fn silent_channels(&self, speaker: &SpeakerId) -> Vec<Service> {
        self.devices
            .get(speaker)
            .map(|runtime| runtime.activity.silent_channels())
            .unwrap_or_else(|| Service::ALL.to_vec())
    }

    pub(crate) fn event_sink(&self, speaker: &SpeakerId) -> Option<EventSink> {
        self.devices.get(speaker).map(|runtime| runtime.sink.clone())
    }

    /// Subscribe every service of `speaker`; failures leave the channel polled
    pub(crate) async fn subscribe_all(&self, speaker: &SpeakerId) {
        let Some(sink) = self.event_sink(speaker) else {
            return;
        };
        for service in Service::ALL {
            let id = speaker.clone();
            let service_sink = sink.clone();
            match self
                .call(move |proxy| proxy.subscribe(&id, service, service_sink))
                .await
            {
                Ok(subscription) => {
                    if let Some(mut runtime) = self.devices.get_mut(speaker) {
                        runtime.activity.mark_subscribed(service);
                        runtime.subscriptions.lock().push(subscription);
                    }
                }
                Err(e) => warn!(
                    "Failed to subscribe to {} on {}: {}",
                    service.service_uri(),
                    speaker,
                    e
                ),
            }
        }
    }

    /// Drop all subscriptions of `speaker`
    pub(crate) async fn unsubscribe_all(&self, speaker: &SpeakerId) {
        let subscriptions = match self.devices.get_mut(speaker) {
            Some(mut runtime) => {
                runtime.activity.clear();
                std::mem::take(&mut *runtime.subscriptions.lock())
            }
            None => return,
        };
        if subscriptions.is_empty() {
            return;
        }

        let id = speaker.clone();
        let result = self
            .pool
            .run(move || {
                for mut subscription in subscriptions {
                    if let Err(e) = subscription.unsubscribe() {
                        debug!("Unsubscribe {} on {} failed: {}", subscription.service(), id, e);
                    }
                }
            })
            .await;
        if let Err(e) = result {
            warn!("Could not release subscriptions of {}: {}", speaker, e);
        }
    }

    /// Speaker info, volume, favorites, subscriptions and household topology
    pub(crate) async fn initialize(&self, speaker: &SpeakerId) -> Result<()> {
        let id = speaker.clone();
        let info = self.call(move |proxy| proxy.speaker_info(&id)).await?;
        self.states.update(speaker, |state| {
            state.name = info.zone_name;
            state.model = info.model_name;
            state.available = true;
        })?;

        if let Err(e) = self.update_volume(speaker).await {
            debug!("Initial volume poll of {} failed: {}", speaker, e);
        }
        self.update_favorites(speaker).await;

        if let Some(mut runtime) = self.devices.get_mut(speaker) {
            runtime.activity.clear();
        }
        self.subscribe_all(speaker).await;

        // A new player changes what every player's group view looks like
        for other in self.topology.speakers() {
            if let Err(e) = self.update_groups(&other, None).await {
                debug!("Group rebuild for {} failed: {}", other, e);
            }
        }

        if self.topology.is_coordinator(speaker) {
            if let Err(e) = self.update_media(speaker, None).await {
                debug!("Initial media poll of {} failed: {}", speaker, e);
            }
        }
        Ok(())
    }

    pub(crate) fn stop_runtime(&self, speaker: &SpeakerId) -> Option<DeviceRuntime> {
        let (_, runtime) = self.devices.remove(speaker)?;
        runtime.dispatcher.abort();
        Some(runtime)
    }
}

/// Keeps a household's group topology and playback state in sync
///
/// # Example
///
/// ```rust,ignore
/// use sonos_sync::{EngineConfig, SyncEngine};
///
/// let engine = SyncEngine::new(proxy, EngineConfig::default())?;
/// engine.add_device(&living_room).await?;
/// engine.add_device(&kitchen).await?;
///
/// let outcome = engine.join(&living_room, &[kitchen.clone()]).await;
/// assert!(outcome.convergence.is_converged());
/// ```
#[derive(Clone)]
pub struct SyncEngine {
    pub(crate) inner: Arc<EngineInner>,
}

impl SyncEngine {
    pub fn new(proxy: Arc<dyn DeviceProxy>, config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let topology = Arc::new(TopologyStore::new());
        let group_views = Arc::new(GroupViewCache::new(config.group_view_ttl));
        let waiter = ConvergenceWaiter::new(Arc::clone(&topology), Arc::clone(&group_views));

        Ok(Self {
            inner: Arc::new(EngineInner {
                pool: WorkerPool::new(config.worker_threads),
                reconciler: Reconciler::new(config.drift_threshold),
                config,
                proxy,
                states: StateStore::new(),
                topology,
                group_views,
                lock: TopologyLock::new(),
                waiter,
                devices: DashMap::new(),
                snapshots: Mutex::new(HashMap::new()),
                refresh_task: Mutex::new(None),
            }),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register a speaker, read its state and subscribe to its events
    ///
    /// Fails if the speaker is already registered or cannot be read at all.
    pub async fn add_device(&self, speaker: &SpeakerId) -> Result<()> {
        let inner = &self.inner;
        if inner.states.contains(speaker) {
            return Err(StateError::AlreadyRegistered(speaker.clone()).into());
        }

        inner
            .states
            .insert(speaker.clone(), DeviceState::new(speaker.as_str(), ""))?;
        inner.topology.register(speaker);

        let (sink, events) = mpsc::unbounded_channel();
        let dispatcher = tokio::spawn(crate::ingest::run_dispatcher(
            Arc::downgrade(inner),
            events,
        ));
        inner.devices.insert(
            speaker.clone(),
            DeviceRuntime {
                subscriptions: Mutex::new(Vec::new()),
                activity: EventActivity::new(),
                sink,
                dispatcher,
            },
        );

        if let Err(e) = inner.initialize(speaker).await {
            warn!("Failed to initialize {}: {}", speaker, e);
            self.remove_device(speaker).await;
            return Err(e);
        }

        info!("Registered speaker {}", speaker);
        Ok(())
    }

    /// Unsubscribe and forget a speaker
    pub async fn remove_device(&self, speaker: &SpeakerId) {
        let inner = &self.inner;
        inner.unsubscribe_all(speaker).await;
        inner.stop_runtime(speaker);

        {
            let _guard = inner.lock.acquire().await;
            let affected = inner.topology.current_group(speaker);
            inner.topology.unregister(speaker);
            inner.group_views.invalidate(speaker);
            inner
                .states
                .emit(StateChange::TopologyChanged { speakers: affected });
        }

        inner.snapshots.lock().remove(speaker);
        if inner.states.remove(speaker).is_some() {
            info!("Removed speaker {}", speaker);
        }
    }

    pub fn devices(&self) -> Vec<SpeakerId> {
        self.inner.states.speaker_ids()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Raw recorded state of a speaker itself
    pub fn device_state(&self, speaker: &SpeakerId) -> Option<DeviceState> {
        self.inner.states.get(speaker)
    }

    /// Host-facing view; playback fields come from the coordinator
    pub fn device_view(&self, speaker: &SpeakerId) -> Option<DeviceView> {
        let inner = &self.inner;
        let own = inner.states.get(speaker)?;
        let coordinator = inner.topology.effective_coordinator(speaker);
        let playback = coordinator
            .as_ref()
            .and_then(|c| inner.states.get(c))
            .unwrap_or_else(|| own.clone());

        Some(DeviceView::new(
            speaker.clone(),
            coordinator,
            inner.topology.current_group(speaker),
            own,
            playback,
        ))
    }

    /// Ordered live group of a speaker, coordinator first
    pub fn group_of(&self, speaker: &SpeakerId) -> Vec<SpeakerId> {
        self.inner.topology.current_group(speaker)
    }

    pub fn groups(&self) -> Vec<Vec<SpeakerId>> {
        self.inner.topology.groups()
    }

    pub fn is_coordinator(&self, speaker: &SpeakerId) -> bool {
        self.inner.topology.is_coordinator(speaker)
    }

    pub fn has_snapshot(&self, speaker: &SpeakerId) -> bool {
        self.inner.snapshots.lock().contains_key(speaker)
    }

    pub fn subscribe_changes(&self) -> broadcast::Receiver<StateChange> {
        self.inner.states.subscribe_changes()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Stop background work and release every subscription
    pub async fn shutdown(&self) {
        if let Some(task) = self.inner.refresh_task.lock().take() {
            task.abort();
        }
        for speaker in self.devices() {
            self.inner.unsubscribe_all(&speaker).await;
            self.inner.stop_runtime(&speaker);
        }
        self.inner.pool.close();
        info!("Sync engine shut down");
    }
}
