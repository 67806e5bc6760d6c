//! Async service that owns the bridge controller.
//!
//! The controller is single-threaded state. [`BridgeService::spawn`] moves it
//! into one task that serializes three inputs: operator requests from any
//! number of [`BridgeHandle`]s, inbound frames from the link, and a periodic
//! tick that settles saved-network refreshes. After every input the task
//! publishes a [`BridgeSnapshot`] on a watch channel.
//!
//! The task stops when cancelled or when the last handle is dropped, and hands
//! the controller back through its join handle.

use crate::bridge::{BridgeController, BridgeError, BridgeEvent, BridgeSnapshot};
use crate::config::EncryptionKind;
use crate::network_list::NetworkRecord;
use crate::settings::SettingsStore;
use crate::transport::Transport;
use log::{debug, info};
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use zeroize::Zeroizing;

/// Interval between refresh settle checks.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Queue depth for operator requests.
const REQUEST_QUEUE_SIZE: usize = 32;

/// An operator request, as queued to the service task.
pub enum Intent {
    BootAsAccessPoint,
    BootAsClient {
        ssid: String,
    },
    SaveNetwork {
        ssid: String,
        kind: EncryptionKind,
        password: Zeroizing<String>,
    },
    RemoveNetwork {
        ssid: String,
    },
    ConfigureAccessPoint {
        ssid: String,
        password: Zeroizing<String>,
    },
    RequestStatus,
    RefreshSavedNetworks,
    SetDefaultNetwork {
        name: String,
    },
    SetScannedNetworks(Vec<NetworkRecord>),
    ConnectionLost(bool),
}

impl Intent {
    fn apply<T: Transport, S: SettingsStore>(
        self,
        controller: &mut BridgeController<T, S>,
    ) -> Result<(), BridgeError> {
        match self {
            Self::BootAsAccessPoint => controller.boot_as_access_point(),
            Self::BootAsClient { ssid } => controller.boot_as_client(&ssid)?,
            Self::SaveNetwork {
                ssid,
                kind,
                password,
            } => controller.save_network(&ssid, kind, &password)?,
            Self::RemoveNetwork { ssid } => controller.remove_network(&ssid)?,
            Self::ConfigureAccessPoint { ssid, password } => {
                controller.configure_access_point(&ssid, &password)?
            }
            Self::RequestStatus => controller.request_status(),
            Self::RefreshSavedNetworks => controller.refresh_saved_networks(),
            Self::SetDefaultNetwork { name } => controller.set_default_network(&name)?,
            Self::SetScannedNetworks(records) => controller.set_scanned_networks(records),
            Self::ConnectionLost(lost) => controller.on_connection_lost(lost),
        }
        Ok(())
    }
}

struct Request {
    intent: Intent,
    reply: oneshot::Sender<Result<(), BridgeError>>,
}

/// Cloneable handle for talking to a running [`BridgeService`].
#[derive(Clone)]
pub struct BridgeHandle {
    requests: mpsc::Sender<Request>,
    snapshots: watch::Receiver<BridgeSnapshot>,
    events: broadcast::Sender<BridgeEvent>,
}

impl BridgeHandle {
    /// Queue an intent and wait for the controller's verdict.
    pub async fn send(&self, intent: Intent) -> Result<(), BridgeError> {
        let (reply, result) = oneshot::channel();
        self.requests
            .send(Request { intent, reply })
            .await
            .map_err(|_| BridgeError::Stopped)?;
        result.await.map_err(|_| BridgeError::Stopped)?
    }

    pub async fn boot_as_access_point(&self) -> Result<(), BridgeError> {
        self.send(Intent::BootAsAccessPoint).await
    }

    pub async fn boot_as_client(&self, ssid: &str) -> Result<(), BridgeError> {
        self.send(Intent::BootAsClient {
            ssid: ssid.to_string(),
        })
        .await
    }

    pub async fn save_network(
        &self,
        ssid: &str,
        kind: EncryptionKind,
        password: &str,
    ) -> Result<(), BridgeError> {
        self.send(Intent::SaveNetwork {
            ssid: ssid.to_string(),
            kind,
            password: Zeroizing::new(password.to_string()),
        })
        .await
    }

    pub async fn remove_network(&self, ssid: &str) -> Result<(), BridgeError> {
        self.send(Intent::RemoveNetwork {
            ssid: ssid.to_string(),
        })
        .await
    }

    pub async fn configure_access_point(&self, ssid: &str, password: &str) -> Result<(), BridgeError> {
        self.send(Intent::ConfigureAccessPoint {
            ssid: ssid.to_string(),
            password: Zeroizing::new(password.to_string()),
        })
        .await
    }

    pub async fn request_status(&self) -> Result<(), BridgeError> {
        self.send(Intent::RequestStatus).await
    }

    pub async fn refresh_saved_networks(&self) -> Result<(), BridgeError> {
        self.send(Intent::RefreshSavedNetworks).await
    }

    pub async fn set_default_network(&self, name: &str) -> Result<(), BridgeError> {
        self.send(Intent::SetDefaultNetwork {
            name: name.to_string(),
        })
        .await
    }

    pub async fn set_scanned_networks(&self, records: Vec<NetworkRecord>) -> Result<(), BridgeError> {
        self.send(Intent::SetScannedNetworks(records)).await
    }

    pub async fn connection_lost(&self, lost: bool) -> Result<(), BridgeError> {
        self.send(Intent::ConnectionLost(lost)).await
    }

    /// Latest published state.
    pub fn snapshot(&self) -> BridgeSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver that observes every published snapshot.
    pub fn watch(&self) -> watch::Receiver<BridgeSnapshot> {
        self.snapshots.clone()
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.events.subscribe()
    }
}

/// Task wrapper around a [`BridgeController`].
pub struct BridgeService;

impl BridgeService {
    /// Move `controller` into a background task.
    ///
    /// `inbound` carries raw frames from the link. The task's join handle
    /// returns the controller once the service stops.
    pub fn spawn<T, S>(
        controller: BridgeController<T, S>,
        inbound: mpsc::Receiver<Vec<u8>>,
        cancel: CancellationToken,
    ) -> (BridgeHandle, JoinHandle<BridgeController<T, S>>)
    where
        T: Transport + Send + 'static,
        S: SettingsStore + Send + 'static,
    {
        let (request_tx, request_rx) = mpsc::channel(REQUEST_QUEUE_SIZE);
        let (snapshot_tx, snapshot_rx) = watch::channel(controller.snapshot());
        let handle = BridgeHandle {
            requests: request_tx,
            snapshots: snapshot_rx,
            events: controller.event_sender(),
        };

        let task = tokio::spawn(Self::run(
            controller,
            inbound,
            request_rx,
            snapshot_tx,
            cancel,
        ));
        (handle, task)
    }

    async fn run<T: Transport, S: SettingsStore>(
        mut controller: BridgeController<T, S>,
        mut inbound: mpsc::Receiver<Vec<u8>>,
        mut requests: mpsc::Receiver<Request>,
        snapshots: watch::Sender<BridgeSnapshot>,
        cancel: CancellationToken,
    ) -> BridgeController<T, S> {
        let mut ticker = tokio::time::interval(POLL_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut inbound_open = true;

        info!("Bridge service started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Bridge service shutting down");
                    break;
                }

                request = requests.recv() => {
                    match request {
                        Some(Request { intent, reply }) => {
                            let result = intent.apply(&mut controller);
                            // Caller may have stopped waiting
                            let _ = reply.send(result);
                        }
                        None => {
                            debug!("All bridge handles dropped");
                            break;
                        }
                    }
                }

                frame = inbound.recv(), if inbound_open => {
                    match frame {
                        Some(bytes) => controller.handle_frame(&bytes),
                        None => {
                            debug!("Inbound frame channel closed");
                            inbound_open = false;
                        }
                    }
                }

                _ = ticker.tick() => {
                    controller.poll_refresh(Instant::now());
                }
            }

            let snapshot = controller.snapshot();
            snapshots.send_if_modified(|current| {
                if *current == snapshot {
                    false
                } else {
                    *current = snapshot;
                    true
                }
            });
        }
        info!("Bridge service stopped");
        controller
    }
}
