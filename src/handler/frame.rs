use std::collections::{HashMap, HashSet};

use chromaudit_cdp::debugger::{EventScriptParsed, ScriptId};
use chromaudit_cdp::network::{EventRequestWillBeSent, LoaderId};
use chromaudit_cdp::page::{
    self, EventDownloadWillBegin, EventFrameAttached, EventFrameNavigated, FrameId,
};
use chromaudit_cdp::runtime::{CallFrame, ExecutionContextId};
use chromaudit_cdp::target::TargetInfo;

use crate::error::{AuditError, Result};
use crate::graph::{self, Edge, Graph, Node, NONE};

/// One frame's accumulated state across its racy event sources.
///
/// A frame may be reified by whichever of `targetCreated`, `frameAttached`,
/// `frameNavigated`, `requestWillBeSent` or `scriptParsed` arrives first; the
/// lifecycle flags record which of those we have actually seen so every
/// handler can tell a race from a protocol violation.
#[derive(Debug)]
pub struct Frame {
    frame_id: FrameId,
    /// The current document load. `None` until some event supplies it; the
    /// frame's emitted identity is `frame_id-loader_id` with `0` standing in
    /// for an unset loader.
    loader_id: Option<LoaderId>,
    url: Option<String>,
    security_origin: Option<String>,
    mime_type: Option<String>,
    name: Option<String>,
    title: Option<String>,
    frame_type: Option<String>,
    exec_context: Option<ExecutionContextId>,

    requests: u64,
    responses: u64,
    scripts_parsed: u64,

    observed_creation: bool,
    has_attached: bool,
    has_navigated: bool,
    /// The loader was synthesized from a network event before any navigate.
    network_set_loader: bool,
    /// The frame itself was created lazily by a network event.
    network_inserted: bool,

    /// Back-references by frame id, resolved through the table at log time.
    parent: Option<FrameId>,
    opener: Option<FrameId>,
    /// Call frame that ran the attaching script, when the attach was
    /// script-initiated.
    creator: Option<CallFrame>,
    /// Composite id of the identity this frame navigated away from.
    navigated_from: Option<String>,
    /// Composite id of the same frame under its previous loader.
    prev_version: Option<String>,
    transition_type: Option<String>,
    destination_url: Option<String>,

    scripts: HashSet<ScriptId>,
    /// scriptParsed events held back until the loader is final; drained when
    /// the frame is logged.
    script_queue: Vec<EventScriptParsed>,

    is_logged: bool,
}

impl Frame {
    fn new(frame_id: FrameId) -> Self {
        Self {
            frame_id,
            loader_id: None,
            url: None,
            security_origin: None,
            mime_type: None,
            name: None,
            title: None,
            frame_type: None,
            exec_context: None,
            requests: 0,
            responses: 0,
            scripts_parsed: 0,
            observed_creation: false,
            has_attached: false,
            has_navigated: false,
            network_set_loader: false,
            network_inserted: false,
            parent: None,
            opener: None,
            creator: None,
            navigated_from: None,
            prev_version: None,
            transition_type: None,
            destination_url: None,
            scripts: HashSet::new(),
            script_queue: Vec::new(),
            is_logged: false,
        }
    }

    /// Build a frame from the payload of `frameNavigated` or `getFrameTree`.
    fn from_cdp(frame: &page::Frame) -> Self {
        let mut out = Self::new(frame.id.clone());
        out.loader_id = Some(frame.loader_id.clone());
        let url = match &frame.url_fragment {
            Some(fragment) => format!("{}{}", frame.url, fragment),
            None => frame.url.clone(),
        };
        out.url = Some(url);
        out.security_origin = frame.security_origin.clone();
        out.mime_type = frame.mime_type.clone();
        out.name = Some(frame.name.clone().unwrap_or_else(|| NONE.to_string()));
        out
    }

    pub fn frame_id(&self) -> &FrameId {
        &self.frame_id
    }

    pub fn loader_id(&self) -> Option<&LoaderId> {
        self.loader_id.as_ref()
    }

    fn loader_str(&self) -> &str {
        self.loader_id.as_ref().map(AsRef::as_ref).unwrap_or("0")
    }

    /// `frame_id-loader_id`, the identity the frame is emitted under. It
    /// changes whenever the loader changes.
    pub fn composite_id(&self) -> String {
        format!("{}-{}", self.frame_id, self.loader_str())
    }

    pub fn is_logged(&self) -> bool {
        self.is_logged
    }

    pub fn requests(&self) -> u64 {
        self.requests
    }

    pub fn scripts_parsed(&self) -> u64 {
        self.scripts_parsed
    }

    pub fn network_inserted(&self) -> bool {
        self.network_inserted
    }

    pub fn network_set_loader(&self) -> bool {
        self.network_set_loader
    }

    /// Every script id parsed in this frame so far.
    pub fn scripts(&self) -> &HashSet<ScriptId> {
        &self.scripts
    }

    fn to_node(&self, graph: &Graph) -> Node {
        let mut node = Node::frame(graph.context(), self.composite_id())
            .prop("frame_id", self.frame_id.as_ref())
            .prop("loader_id", self.loader_str());
        if let Some(url) = &self.url {
            node = node.prop("url", url.as_str());
        }
        if let Some(origin) = &self.security_origin {
            node = node.prop("securityOrigin", origin.as_str());
        }
        if let Some(mime) = &self.mime_type {
            node = node.prop("mimeType", mime.as_str());
        }
        if let Some(name) = &self.name {
            node = node.prop("name", name.as_str());
        }
        if let Some(title) = &self.title {
            node = node.prop("title", title.as_str());
        }
        if let Some(frame_type) = &self.frame_type {
            node = node.prop("type", frame_type.as_str());
        }
        if let Some(ctx_id) = &self.exec_context {
            node = node.prop("exec_context", ctx_id.to_string());
        }
        node.prop("requests", self.requests.to_string())
            .prop("responses", self.responses.to_string())
            .prop("scripts_parsed", self.scripts_parsed.to_string())
    }
}

/// Maintains the frame table and reconciles the out-of-order event streams
/// into a consistent frame/loader lifecycle.
pub struct FrameManager {
    frames: HashMap<FrameId, Frame>,
    /// Insertion order, so shutdown logging is deterministic.
    order: Vec<FrameId>,
}

impl FrameManager {
    pub fn new() -> Self {
        Self {
            frames: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn get(&self, frame_id: &FrameId) -> Option<&Frame> {
        self.frames.get(frame_id)
    }

    /// Get a frame, inserting an empty one if it is new.
    fn emplace(&mut self, frame_id: &FrameId) -> &mut Frame {
        if !self.frames.contains_key(frame_id) {
            self.order.push(frame_id.clone());
            self.frames
                .insert(frame_id.clone(), Frame::new(frame_id.clone()));
        }
        self.frames.get_mut(frame_id).expect("just inserted")
    }

    fn install(&mut self, frame: Frame) {
        if !self.frames.contains_key(&frame.frame_id) {
            self.order.push(frame.frame_id.clone());
        }
        self.frames.insert(frame.frame_id.clone(), frame);
    }

    /// `Target.targetCreated` for pages and iframes; the earliest point a
    /// frame can become known when the auditor sees its whole life.
    pub fn on_target_created(&mut self, info: &TargetInfo) -> Result<()> {
        if info.r#type != "page" && info.r#type != "iframe" {
            return Ok(());
        }
        let frame_id = FrameId::new(info.target_id.as_ref());

        // A page opened by another page names its opener; the opener must
        // have been created first, anything else is an impossible ordering.
        let mut opener = None;
        if info.r#type == "page" && !info.url.is_empty() {
            if let Some(opener_id) = &info.opener_id {
                let opener_fid = FrameId::new(opener_id.as_ref());
                if !self.frames.contains_key(&opener_fid) {
                    return Err(AuditError::anomaly(format!(
                        "target {} opened by unknown {}",
                        info.target_id, opener_id
                    )));
                }
                opener = Some(opener_fid);
            }
        }

        let frame = self.emplace(&frame_id);
        frame.observed_creation = true;
        if opener.is_some() {
            frame.opener = opener;
        }
        if !info.url.is_empty() {
            frame.url = Some(info.url.clone());
        }
        if !info.title.is_empty() {
            frame.title = Some(info.title.clone());
        }
        frame.frame_type = Some(info.r#type.clone());
        Ok(())
    }

    /// Whether an `attachedToTarget` for this target means a frame that
    /// predates the audit and must be reconstructed from `getFrameTree`.
    pub fn needs_bootstrap(&self, info: &TargetInfo) -> bool {
        if info.r#type != "page" {
            return false;
        }
        let frame_id = FrameId::new(info.target_id.as_ref());
        !self
            .frames
            .get(&frame_id)
            .map(|frame| frame.observed_creation)
            .unwrap_or(false)
    }

    /// Install a frame recovered from `Page.getFrameTree`. Creation,
    /// attach and navigation all happened before we were listening, so the
    /// latches are set up front; a repeated `attachedToTarget` for the same
    /// tab must not reconstruct the frame again.
    pub fn install_bootstrapped(&mut self, root: &page::Frame) {
        let mut frame = Frame::from_cdp(root);
        frame.observed_creation = true;
        frame.has_navigated = true;
        frame.has_attached = true;
        self.install(frame);
    }

    pub fn on_frame_attached(&mut self, ev: &EventFrameAttached) -> Result<()> {
        if !self.frames.contains_key(&ev.parent_frame_id) {
            return Err(AuditError::anomaly(format!(
                "frameAttached({}) with unknown parent {}",
                ev.frame_id, ev.parent_frame_id
            )));
        }
        let creator = ev.stack.as_ref().and_then(|stack| stack.caller()).cloned();
        let child = self.emplace(&ev.frame_id);
        if let Some(existing) = &child.parent {
            if existing != &ev.parent_frame_id {
                return Err(AuditError::anomaly(format!(
                    "frame {} reattached from {} to {}",
                    ev.frame_id, existing, ev.parent_frame_id
                )));
            }
        }
        child.creator = creator;
        child.parent = Some(ev.parent_frame_id.clone());
        child.has_attached = true;
        Ok(())
    }

    pub fn on_frame_navigated(&mut self, ev: &EventFrameNavigated, graph: &mut Graph) -> Result<()> {
        let mut incoming = Frame::from_cdp(&ev.frame);
        incoming.transition_type = ev.r#type.clone();

        let Some(current_loader) = self.frames.get(&ev.frame.id).map(|f| f.loader_id.clone())
        else {
            // An iframe can navigate before it attaches; seen rarely in the
            // wild and only ever for the initial empty document.
            if incoming.url.as_deref() != Some("about:blank") {
                return Err(AuditError::anomaly(format!(
                    "frame {} navigated to {:?} before it was known",
                    ev.frame.id, incoming.url
                )));
            }
            incoming.has_navigated = true;
            self.install(incoming);
            return Ok(());
        };

        if current_loader == incoming.loader_id {
            // Same document; identity is unchanged and nothing is emitted.
            let current = self.frames.get_mut(&ev.frame.id).expect("frame checked above");
            current.has_navigated = true;
        } else if current_loader.is_none() {
            // First navigate for a frame reified by an earlier event; absorb
            // the loader and document attributes into the existing entry.
            let current = self.frames.get_mut(&ev.frame.id).expect("frame checked above");
            current.loader_id = incoming.loader_id;
            current.url = incoming.url;
            current.security_origin = incoming.security_origin;
            current.mime_type = incoming.mime_type;
            current.name = incoming.name;
            current.has_navigated = true;
        } else {
            // Cross-document navigation: the old identity is complete, emit
            // it, then start a fresh one linked back to it.
            let mut old = self
                .frames
                .remove(&ev.frame.id)
                .expect("frame checked above");
            self.log_frame(&mut old, graph)?;
            incoming.has_attached = old.has_attached;
            incoming.has_navigated = true;
            incoming.navigated_from = Some(old.composite_id());
            incoming.prev_version = Some(old.composite_id());
            incoming.destination_url = incoming.url.clone();
            self.install(incoming);
        }
        Ok(())
    }

    /// First stop for `requestWillBeSent`: redirect detection, then the
    /// frame-state branches. The caller guarantees `frame_id` is present.
    pub fn on_request_sent(
        &mut self,
        ev: &EventRequestWillBeSent,
        graph: &mut Graph,
    ) -> Result<()> {
        let frame_id = ev
            .frame_id
            .as_ref()
            .ok_or_else(|| AuditError::anomaly("requestWillBeSent without frameId"))?;

        self.detect_redirect(ev, frame_id, graph)?;

        if !self.frames.contains_key(frame_id) {
            // The network stack out-raced the page inspector (high priority
            // requests, window.open): reify the frame from what the request
            // tells us.
            let frame = self.emplace(frame_id);
            frame.loader_id = Some(ev.loader_id.clone());
            frame.requests += 1;
            frame.network_set_loader = true;
            frame.network_inserted = true;
            if frame.url.is_none() {
                frame.url = Some(ev.document_url.clone());
            }
            return Ok(());
        }

        let frame = self.frames.get_mut(frame_id).expect("checked above");
        if ev.initiator.r#type == "parser" {
            if !frame.has_navigated || frame.loader_id.as_ref() != Some(&ev.loader_id) {
                return Err(AuditError::anomaly(format!(
                    "parser request for {} against loader {} but frame is at {}",
                    frame_id,
                    ev.loader_id,
                    frame.loader_str()
                )));
            }
            frame.requests += 1;
            return Ok(());
        }

        if !frame.has_navigated {
            if frame.loader_id.is_some() && !frame.network_set_loader {
                return Err(AuditError::anomaly(format!(
                    "unnavigated frame {} already has loader {} from elsewhere",
                    frame_id,
                    frame.loader_str()
                )));
            }
            // Adopt the loader preemptively; frameNavigated will confirm it.
            frame.requests += 1;
            frame.loader_id = Some(ev.loader_id.clone());
            frame.network_set_loader = true;
            if frame.url.is_none() {
                frame.url = Some(ev.document_url.clone());
            }
        }
        Ok(())
    }

    /// A script replacing its own frame's top-level document: the request id
    /// of a document load doubles as the new loader id, and a script
    /// initiator on such a load means the old loader was abandoned.
    fn detect_redirect(
        &self,
        ev: &EventRequestWillBeSent,
        frame_id: &FrameId,
        graph: &mut Graph,
    ) -> Result<()> {
        if ev.request_id.as_ref() != ev.loader_id.as_ref() || ev.initiator.r#type != "script" {
            return Ok(());
        }
        let Some(old_loader) = self.frames.get(frame_id).and_then(|f| f.loader_id.clone()) else {
            // A frame that never loaded anything has nothing to redirect.
            return Ok(());
        };
        let caller = ev
            .initiator
            .stack
            .as_ref()
            .and_then(|stack| stack.caller())
            .ok_or_else(|| {
                AuditError::anomaly(format!("script-initiated load of {} without a call stack", ev.request_id))
            })?;
        let record = Node::redirect_record(
            graph.context(),
            &old_loader,
            &ev.loader_id,
            frame_id,
            &caller.script_id,
            &ev.request_id,
        );
        tracing::debug!(frame = %frame_id, old = %old_loader, new = %ev.loader_id, "redirect detected");
        graph.add_node(record)
    }

    /// Queue the script against its frame; the node is only emitted once the
    /// frame's loader is final, i.e. when the frame is logged.
    pub fn on_script_parsed(&mut self, ev: EventScriptParsed) {
        let Some(frame_id) = ev
            .execution_context_aux_data
            .as_ref()
            .and_then(|aux| aux.frame_id.clone())
        else {
            return;
        };
        let frame = self.emplace(&frame_id);
        frame.exec_context = Some(ev.execution_context_id);
        frame.scripts_parsed += 1;
        frame.scripts.insert(ev.script_id.clone());
        frame.script_queue.push(ev);
    }

    pub fn on_download(&mut self, ev: &EventDownloadWillBegin, graph: &mut Graph) -> Result<()> {
        let frame = self.frames.get(&ev.frame_id).ok_or_else(|| {
            AuditError::anomaly(format!("download from unknown frame {}", ev.frame_id))
        })?;
        graph.add_edge(Edge::download(graph.context(), &frame.composite_id(), &ev.url))
    }

    /// Emit one frame and everything deferred onto it, in a fixed order:
    /// the frame node, queued scripts, then attach / navigate / version /
    /// created / opened edges. A frame is logged at most once.
    fn log_frame(&self, frame: &mut Frame, graph: &mut Graph) -> Result<()> {
        if frame.is_logged {
            return Ok(());
        }
        graph.add_node(frame.to_node(graph))?;

        let composite = frame.composite_id();
        for queued in std::mem::take(&mut frame.script_queue) {
            let node = Node::script(
                graph.context(),
                &queued.script_id,
                &frame.frame_id,
                frame.loader_str(),
            )
            .prop("exec_context", queued.execution_context_id.to_string())
            .prop("url", queued.url.as_deref().unwrap_or(NONE))
            .prop("hash", queued.hash.as_str());
            graph.add_node(node)?;
        }

        if let Some(parent_id) = &frame.parent {
            match self.frames.get(parent_id) {
                Some(parent) => {
                    let mut edge = Edge::new(
                        graph.context(),
                        graph::FRAME_ATTACHED,
                        parent.composite_id(),
                        composite.clone(),
                        None,
                    );
                    if let Some(creator) = &frame.creator {
                        edge = edge
                            .prop("scriptId", creator.script_id.as_ref())
                            .prop("url", creator.url.as_str());
                    }
                    graph.add_edge(edge)?;
                }
                None => {
                    tracing::warn!(frame = %frame.frame_id, parent = %parent_id,
                        "attach edge dropped, parent left the table");
                }
            }
        }

        if let Some(from) = &frame.navigated_from {
            let edge = Edge::new(
                graph.context(),
                graph::NAVIGATION_EDGES,
                from.clone(),
                composite.clone(),
                None,
            )
            .opt_prop("transitionType", frame.transition_type.as_deref())
            .opt_prop("destination", frame.destination_url.as_deref());
            graph.add_edge(edge)?;
        }

        if let Some(prev) = &frame.prev_version {
            graph.add_edge(Edge::new(
                graph.context(),
                graph::FRAME_EDGES,
                prev.clone(),
                composite.clone(),
                None,
            ))?;
        }

        if let (Some(creator), Some(parent_id)) = (&frame.creator, &frame.parent) {
            if let Some(parent) = self.frames.get(parent_id) {
                let script = Node::script(
                    graph.context(),
                    &creator.script_id,
                    &parent.frame_id,
                    parent.loader_str(),
                );
                let script_id = script.id.clone();
                graph.add_node(script)?;
                graph.add_edge(Edge::new(
                    graph.context(),
                    graph::CREATED,
                    composite.clone(),
                    script_id,
                    None,
                ))?;
            }
        }

        if let Some(opener_id) = &frame.opener {
            match self.frames.get(opener_id) {
                Some(opener) => {
                    graph.add_edge(Edge::new(
                        graph.context(),
                        graph::OPENED,
                        opener.composite_id(),
                        composite.clone(),
                        None,
                    ))?;
                }
                None => {
                    tracing::warn!(frame = %frame.frame_id, opener = %opener_id,
                        "opened edge dropped, opener left the table");
                }
            }
        }

        frame.is_logged = true;
        Ok(())
    }

    /// Shutdown path: emit every frame that has not been logged yet, in the
    /// order the frames were first seen.
    pub fn log_all(&mut self, graph: &mut Graph) -> Result<()> {
        let order = self.order.clone();
        for frame_id in order {
            let Some(frame) = self.frames.get(&frame_id) else {
                continue;
            };
            if frame.is_logged {
                continue;
            }
            let mut frame = self.frames.remove(&frame_id).expect("checked above");
            let result = self.log_frame(&mut frame, graph);
            self.frames.insert(frame_id, frame);
            result?;
        }
        Ok(())
    }
}

impl Default for FrameManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AuditContext;
    use crate::writer::RelationWriter;

    fn graph(dir: &std::path::Path) -> Graph {
        Graph::new(
            AuditContext::fixed("S".repeat(32), "tester"),
            RelationWriter::new(dir, 50_000).unwrap(),
        )
    }

    fn nav(json: &str) -> EventFrameNavigated {
        serde_json::from_str(json).unwrap()
    }

    fn req(json: &str) -> EventRequestWillBeSent {
        serde_json::from_str(json).unwrap()
    }

    fn labels(dir: &std::path::Path) -> Vec<String> {
        let mut out: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| {
                let name = e.unwrap().file_name();
                name.to_str().unwrap().split('.').next().unwrap().to_string()
            })
            .collect();
        out.sort();
        out.dedup();
        out
    }

    #[test]
    fn navigate_before_attach_is_only_legal_for_the_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let mut g = graph(dir.path());
        let mut frames = FrameManager::new();

        let err = frames.on_frame_navigated(
            &nav(r#"{"frame":{"id":"f9","loaderId":"L9","url":"https://a/"}}"#),
            &mut g,
        );
        assert!(matches!(err, Err(AuditError::ProtocolAnomaly(_))));

        frames
            .on_frame_navigated(
                &nav(r#"{"frame":{"id":"f8","loaderId":"L8","url":"about:blank"}}"#),
                &mut g,
            )
            .unwrap();
        assert_eq!(
            frames.get(&FrameId::new("f8")).unwrap().composite_id(),
            "f8-L8"
        );
    }

    #[test]
    fn attaching_under_an_unknown_parent_is_an_anomaly() {
        let mut frames = FrameManager::new();
        let ev: EventFrameAttached =
            serde_json::from_str(r#"{"frameId":"c1","parentFrameId":"nope"}"#).unwrap();
        assert!(matches!(
            frames.on_frame_attached(&ev),
            Err(AuditError::ProtocolAnomaly(_))
        ));
    }

    #[test]
    fn same_document_navigation_does_not_version_the_frame() {
        let dir = tempfile::tempdir().unwrap();
        let mut g = graph(dir.path());
        let mut frames = FrameManager::new();
        let to_anchor =
            r#"{"frame":{"id":"f1","loaderId":"L1","url":"about:blank"}}"#;
        frames.on_frame_navigated(&nav(to_anchor), &mut g).unwrap();
        frames.on_frame_navigated(&nav(to_anchor), &mut g).unwrap();

        let frame = frames.get(&FrameId::new("f1")).unwrap();
        assert!(!frame.is_logged());
        g.flush_all().unwrap();
        // Nothing was emitted for the second navigate.
        assert!(labels(dir.path()).is_empty());
    }

    #[test]
    fn parser_request_against_the_wrong_loader_is_an_anomaly() {
        let dir = tempfile::tempdir().unwrap();
        let mut g = graph(dir.path());
        let mut frames = FrameManager::new();
        frames
            .on_frame_navigated(
                &nav(r#"{"frame":{"id":"f1","loaderId":"L1","url":"about:blank"}}"#),
                &mut g,
            )
            .unwrap();
        let err = frames.on_request_sent(
            &req(
                r#"{"requestId":"R1","loaderId":"L2","documentURL":"https://a/","request":{"url":"https://a/","method":"GET","headers":{}},"timestamp":1.0,"wallTime":1.0,"initiator":{"type":"parser"},"frameId":"f1"}"#,
            ),
            &mut g,
        );
        assert!(matches!(err, Err(AuditError::ProtocolAnomaly(_))));
    }

    #[test]
    fn no_redirect_for_a_frame_that_never_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let mut g = graph(dir.path());
        let mut frames = FrameManager::new();
        // Known frame, loader still unset: a script-initiated document load
        // adopts the loader instead of recording a redirect.
        let info: TargetInfo = serde_json::from_str(
            r#"{"targetId":"f1","type":"iframe","title":"","url":"","attached":false}"#,
        )
        .unwrap();
        frames.on_target_created(&info).unwrap();
        frames
            .on_request_sent(
                &req(
                    r#"{"requestId":"L7","loaderId":"L7","documentURL":"https://a/","request":{"url":"https://a/","method":"GET","headers":{}},"timestamp":1.0,"wallTime":1.0,"initiator":{"type":"script","stack":{"callFrames":[{"functionName":"","scriptId":"S1","url":"x.js","lineNumber":0,"columnNumber":0}]}},"frameId":"f1"}"#,
                ),
                &mut g,
            )
            .unwrap();

        let frame = frames.get(&FrameId::new("f1")).unwrap();
        assert_eq!(frame.loader_id().unwrap().as_ref(), "L7");
        g.flush_all().unwrap();
        assert!(!labels(dir.path()).contains(&"redirect".to_string()));
    }

    #[test]
    fn counters_survive_the_loader_upgrade() {
        let dir = tempfile::tempdir().unwrap();
        let mut g = graph(dir.path());
        let mut frames = FrameManager::new();
        // Network wins the race, then the navigate confirms the loader.
        frames
            .on_request_sent(
                &req(
                    r#"{"requestId":"R1","loaderId":"L1","documentURL":"https://a/","request":{"url":"https://a/","method":"GET","headers":{}},"timestamp":1.0,"wallTime":1.0,"initiator":{"type":"other"},"frameId":"f1"}"#,
                ),
                &mut g,
            )
            .unwrap();
        frames
            .on_frame_navigated(
                &nav(r#"{"frame":{"id":"f1","loaderId":"L1","url":"https://a/"}}"#),
                &mut g,
            )
            .unwrap();

        let frame = frames.get(&FrameId::new("f1")).unwrap();
        assert!(frame.network_inserted());
        assert_eq!(frame.requests(), 1);
        assert_eq!(frame.composite_id(), "f1-L1");
    }
}
