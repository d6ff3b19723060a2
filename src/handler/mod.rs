use std::collections::{HashMap, HashSet, VecDeque};

use chromaudit_cdp::debugger;
use chromaudit_cdp::debugger::EventScriptParsed;
use chromaudit_cdp::network as cdp_network;
use chromaudit_cdp::network::{EventRequestWillBeSent, EventResponseReceived};
use chromaudit_cdp::page;
use chromaudit_cdp::page::{
    EventDownloadWillBegin, EventFrameAttached, EventFrameNavigated,
    EventJavascriptDialogOpening, EventWindowOpen, GetFrameTreeParams,
    SetLifecycleEventsEnabledParams,
};
use chromaudit_cdp::runtime::RunIfWaitingForDebuggerParams;
use chromaudit_cdp::target::{
    AttachToBrowserTargetParams, AttachToTargetParams, AttachToTargetReturns,
    EventAttachedToTarget, EventTargetCreated, EventTargetInfoChanged, GetTargetsParams,
    SessionId, SetAutoAttachParams, SetDiscoverTargetsParams, TargetId, TargetInfo,
};
use chromaudit_types::{Command, EventMessage, Message, Method};

use crate::conn::{CallOutcome, Connection, RESULT_TIMEOUT};
use crate::error::Result;
use crate::graph::Graph;

pub mod frame;
pub mod network;
pub mod session;

use frame::FrameManager;
use network::NetworkManager;
use session::Session;

/// The top-level handler: owns the multiplexed connection, attaches to every
/// page target, and routes the event stream into the frame engine and the
/// graph.
pub struct Handler {
    conn: Connection,
    graph: Graph,
    frames: FrameManager,
    network: NetworkManager,
    /// All active sessions, keyed by session id.
    sessions: HashMap<SessionId, Session>,
    /// Targets we have already attached to; duplicates are skipped.
    targets_attached: HashSet<TargetId>,
    /// Envelopes awaiting dispatch, in arrival order. `wait_result` feeds
    /// the events it observed while blocking back into this queue.
    queue: VecDeque<Message>,
}

impl Handler {
    pub fn new(conn: Connection, graph: Graph) -> Self {
        Self {
            conn,
            graph,
            frames: FrameManager::new(),
            network: NetworkManager::new(),
            sessions: HashMap::new(),
            targets_attached: HashSet::new(),
            queue: VecDeque::new(),
        }
    }

    /// Attach to the browser target and every already-open page, enabling
    /// the inspector domains we need on each.
    pub async fn init(&mut self) -> Result<()> {
        self.graph.record_session_start()?;
        tracing::info!(
            session = self.graph.context().session_id(),
            user = self.graph.context().user_id(),
            "new browsing session"
        );

        let (resp, pending) = self
            .conn
            .execute(AttachToBrowserTargetParams::default(), None)
            .await?;
        self.queue.extend(pending);
        tracing::debug!(browser_session = resp.session_id.as_ref(), "attached to browser");

        let (targets, pending) = self.conn.execute(GetTargetsParams::default(), None).await?;
        self.queue.extend(pending);
        for info in &targets.target_infos {
            self.attach_to_target(info).await?;
        }
        Ok(())
    }

    /// Attach to one target and enable the DevTools domains we need
    /// messages from. Attach errors are logged and skip the target; a
    /// timeout on an enable call is logged and tolerated.
    async fn attach_to_target(&mut self, info: &TargetInfo) -> Result<()> {
        if !self.targets_attached.insert(info.target_id.clone()) {
            tracing::warn!(target_id = %info.target_id, "already attached");
            return Ok(());
        }

        let params = AttachToTargetParams::new(info.target_id.clone());
        let id = self
            .conn
            .send(params.identifier(), None, serde_json::to_value(params)?)
            .await?;
        let (outcome, pending) = self.conn.wait_result(id, RESULT_TIMEOUT).await?;
        self.queue.extend(pending);
        let session_id = match outcome {
            CallOutcome::Result(value) => {
                serde_json::from_value::<AttachToTargetReturns>(value)?.session_id
            }
            CallOutcome::Error(err) => {
                tracing::error!(target_id = %info.target_id, %err, "error attaching");
                return Ok(());
            }
            CallOutcome::Timeout | CallOutcome::Closed => {
                tracing::error!(target_id = %info.target_id, "no answer attaching");
                return Ok(());
            }
        };
        self.sessions.insert(
            session_id.clone(),
            Session::new(session_id.clone(), info.target_id.clone()),
        );

        self.enable(SetDiscoverTargetsParams::new(true), &session_id)
            .await?;
        // windowOpen is handled through targetCreated, so no auto-attach.
        self.enable(
            SetAutoAttachParams {
                auto_attach: false,
                wait_for_debugger_on_start: false,
                flatten: Some(true),
                window_open: Some(false),
            },
            &session_id,
        )
        .await?;
        self.enable(page::EnableParams::default(), &session_id).await?;
        self.enable(cdp_network::EnableParams::default(), &session_id)
            .await?;
        self.enable(debugger::EnableParams::default(), &session_id)
            .await?;
        self.enable(SetLifecycleEventsEnabledParams::new(true), &session_id)
            .await?;
        Ok(())
    }

    async fn enable<T: Command>(&mut self, cmd: T, session_id: &SessionId) -> Result<()> {
        let method = cmd.identifier();
        let id = self
            .conn
            .send(method.clone(), Some(session_id), serde_json::to_value(cmd)?)
            .await?;
        let (outcome, pending) = self.conn.wait_result(id, RESULT_TIMEOUT).await?;
        self.queue.extend(pending);
        match outcome {
            CallOutcome::Result(_) => {}
            CallOutcome::Error(err) => tracing::error!(%method, %err, "error enabling domain"),
            CallOutcome::Timeout | CallOutcome::Closed => {
                tracing::error!(%method, "no result enabling domain")
            }
        }
        Ok(())
    }

    /// The main loop: pull envelopes, dispatch them in arrival order, and
    /// shut down on interrupt or transport closure. Protocol anomalies
    /// propagate out of here.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            while let Some(msg) = self.queue.pop_front() {
                self.dispatch(msg).await?;
            }

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("interrupt received, shutting down");
                    return self.shutdown().await;
                }
                msg = self.conn.recv() => match msg {
                    None => {
                        tracing::info!("transport closed, shutting down");
                        return self.shutdown().await;
                    }
                    Some(Err(err)) => {
                        tracing::error!(%err, "transport error, shutting down");
                        return self.shutdown().await;
                    }
                    Some(Ok(msg)) => {
                        self.queue.push_back(msg);
                        match self.conn.drain() {
                            Ok(more) => self.queue.extend(more),
                            Err(err) => {
                                tracing::error!(%err, "drain failed, shutting down");
                                return self.shutdown().await;
                            }
                        }
                    }
                }
            }
        }
    }

    /// The target an envelope's session belongs to, when it names a session
    /// we attached.
    fn session_target(&self, session_id: Option<&str>) -> Option<&TargetId> {
        let id = SessionId::new(session_id?);
        self.sessions.get(&id).map(Session::target_id)
    }

    async fn dispatch(&mut self, msg: Message) -> Result<()> {
        let Message::Event(ev) = msg else {
            // A response nothing waits for anymore; stale by definition.
            return Ok(());
        };
        if let Some(target_id) = self.session_target(ev.session_id.as_deref()) {
            tracing::trace!(method = %ev.method, %target_id, "event");
        }
        match ev.method.as_str() {
            EventTargetCreated::IDENTIFIER => {
                let ev: EventTargetCreated = serde_json::from_value(ev.params)?;
                self.on_target_created(ev).await
            }
            EventAttachedToTarget::IDENTIFIER => {
                let ev: EventAttachedToTarget = serde_json::from_value(ev.params)?;
                self.on_target_attached(ev).await
            }
            _ => self.on_protocol_event(ev),
        }
    }

    /// Dispatch for everything that never needs the connection. Also the
    /// best-effort path during shutdown, when no more calls go out.
    fn on_protocol_event(&mut self, ev: EventMessage) -> Result<()> {
        match ev.method.as_str() {
            EventRequestWillBeSent::IDENTIFIER => {
                let ev: EventRequestWillBeSent = serde_json::from_value(ev.params)?;
                if ev.frame_id.is_none() {
                    return Ok(());
                }
                self.frames.on_request_sent(&ev, &mut self.graph)?;
                self.network.on_request_sent(&ev, &mut self.graph)
            }
            EventResponseReceived::IDENTIFIER => {
                let ev: EventResponseReceived = serde_json::from_value(ev.params)?;
                self.network.on_response_received(&ev, &mut self.graph)
            }
            EventFrameAttached::IDENTIFIER => {
                let ev: EventFrameAttached = serde_json::from_value(ev.params)?;
                self.frames.on_frame_attached(&ev)
            }
            EventFrameNavigated::IDENTIFIER => {
                let ev: EventFrameNavigated = serde_json::from_value(ev.params)?;
                self.frames.on_frame_navigated(&ev, &mut self.graph)
            }
            EventDownloadWillBegin::IDENTIFIER => {
                let ev: EventDownloadWillBegin = serde_json::from_value(ev.params)?;
                self.frames.on_download(&ev, &mut self.graph)
            }
            EventScriptParsed::IDENTIFIER => {
                let ev: EventScriptParsed = serde_json::from_value(ev.params)?;
                self.frames.on_script_parsed(ev);
                Ok(())
            }
            // Shutdown-time path for target creation; the live path attaches
            // first in `dispatch`.
            EventTargetCreated::IDENTIFIER => {
                let ev: EventTargetCreated = serde_json::from_value(ev.params)?;
                self.frames.on_target_created(&ev.target_info)
            }
            // windowOpen is covered by targetCreated; dialogs and target
            // info changes carry nothing we audit.
            EventWindowOpen::IDENTIFIER
            | EventJavascriptDialogOpening::IDENTIFIER
            | EventTargetInfoChanged::IDENTIFIER
            | EventAttachedToTarget::IDENTIFIER => Ok(()),
            _ => Ok(()),
        }
    }

    async fn on_target_created(&mut self, ev: EventTargetCreated) -> Result<()> {
        if !ev.target_info.attached && ev.target_info.r#type == "page" {
            self.attach_to_target(&ev.target_info).await?;
        }
        self.frames.on_target_created(&ev.target_info)
    }

    async fn on_target_attached(&mut self, ev: EventAttachedToTarget) -> Result<()> {
        if ev.waiting_for_debugger {
            let call = RunIfWaitingForDebuggerParams::default();
            let id = self
                .conn
                .send(call.identifier(), Some(&ev.session_id), serde_json::to_value(call)?)
                .await?;
            let (outcome, pending) = self.conn.wait_result(id, RESULT_TIMEOUT).await?;
            self.queue.extend(pending);
            match outcome {
                CallOutcome::Result(_) => {}
                CallOutcome::Error(err) => {
                    tracing::warn!(target_id = %ev.target_info.target_id, %err, "runIfWaitingForDebugger failed")
                }
                CallOutcome::Timeout | CallOutcome::Closed => {
                    tracing::error!(target_id = %ev.target_info.target_id, "could not start target");
                    return Ok(());
                }
            }
        }
        self.sessions.insert(
            ev.session_id.clone(),
            Session::new(ev.session_id.clone(), ev.target_info.target_id.clone()),
        );

        if !self.frames.needs_bootstrap(&ev.target_info) {
            return Ok(());
        }
        // The frame predates the audit; most of its lifecycle is gone, so
        // reconstruct what the browser still knows from the frame tree.
        match self
            .conn
            .execute(GetFrameTreeParams::default(), Some(&ev.session_id))
            .await
        {
            Ok((resp, pending)) => {
                self.queue.extend(pending);
                self.frames.install_bootstrapped(&resp.frame_tree.frame);
                Ok(())
            }
            Err(crate::error::AuditError::ResultTimeout(id)) => {
                tracing::error!(target_id = %ev.target_info.target_id, %id, "getFrameTree timed out during bootstrap");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Exit routine: drain what is left, log every frame that has not been
    /// emitted, close the socket, flush all relations to disk.
    async fn shutdown(&mut self) -> Result<()> {
        if let Ok(more) = self.conn.drain() {
            self.queue.extend(more);
        }
        while let Some(msg) = self.queue.pop_front() {
            let Message::Event(ev) = msg else { continue };
            if let Err(err) = self.on_protocol_event(ev) {
                tracing::error!(%err, "dropping event during shutdown");
            }
        }
        self.frames.log_all(&mut self.graph)?;
        self.conn.close().await;
        for session in self.sessions.values() {
            tracing::debug!(
                session_id = session.session_id().as_ref(),
                target_id = %session.target_id(),
                "session abandoned with the transport"
            );
        }
        self.graph.flush_all()?;
        tracing::info!(
            sessions = self.sessions.len(),
            "handler is shut down, flushing complete"
        );
        Ok(())
    }
}
