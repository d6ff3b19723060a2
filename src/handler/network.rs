use fnv::FnvHashMap;

use chromaudit_cdp::network::{EventRequestWillBeSent, EventResponseReceived, RequestId};

use crate::error::{AuditError, Result};
use crate::graph::{self, Edge, Graph, Node, NONE};

/// An emitted request edge, retained so the response can point back at the
/// same initiator/resource pair.
#[derive(Debug, Clone)]
struct PendingRequest {
    /// Initiator node id (script, parser, or synthesized initiator).
    start: String,
    /// Resource node id.
    end: String,
}

/// Tracks requests per request id and turns request/response event pairs
/// into graph edges.
pub struct NetworkManager {
    /// Kept for the life of the run; late responses (redirect chains,
    /// slow bodies) must still find their request.
    pending: FnvHashMap<RequestId, PendingRequest>,
}

impl NetworkManager {
    pub fn new() -> Self {
        Self {
            pending: FnvHashMap::default(),
        }
    }

    /// Emit the initiator (when it is the parser), the resource, and the
    /// request edge between them. Script initiator nodes are not emitted
    /// here; they surface when their owning frame is logged.
    pub fn on_request_sent(&mut self, ev: &EventRequestWillBeSent, graph: &mut Graph) -> Result<()> {
        let frame_id = ev
            .frame_id
            .as_ref()
            .ok_or_else(|| AuditError::anomaly("requestWillBeSent without frameId"))?;

        let initiator_id = match ev.initiator.r#type.as_str() {
            "script" => {
                let caller = ev
                    .initiator
                    .stack
                    .as_ref()
                    .and_then(|stack| stack.caller())
                    .ok_or_else(|| {
                        AuditError::anomaly(format!(
                            "script initiator of {} without a call stack",
                            ev.request_id
                        ))
                    })?;
                Node::script_id(caller.script_id.as_ref(), frame_id, ev.loader_id.as_ref())
            }
            "parser" => {
                let parser = Node::parser(graph.context(), frame_id, &ev.loader_id);
                let id = parser.id.clone();
                graph.add_node(parser)?;
                id
            }
            // `preload`, `SignedExchange`, `other`: there is no script to
            // point at, synthesize an initiator id from the type.
            other => Node::script_id(other, frame_id, ev.loader_id.as_ref()),
        };

        let resource = Node::resource(
            graph.context(),
            &ev.request.url,
            ev.r#type.as_deref().unwrap_or(NONE),
        );
        let resource_id = resource.id.clone();
        graph.add_node(resource)?;

        let edge = Edge::new(
            graph.context(),
            graph::REQUEST_EDGES,
            initiator_id.clone(),
            resource_id.clone(),
            Some(ev.request_id.as_ref()),
        )
        .prop("requestId", ev.request_id.as_ref())
        .prop("method", ev.request.method.as_str())
        .prop("timestamp", ev.timestamp.to_string())
        .prop("wallTime", ev.wall_time.to_string())
        .prop("hasUserGesture", ev.has_user_gesture.to_string())
        .prop("type", ev.r#type.as_deref().unwrap_or(NONE));
        graph.add_edge(edge)?;

        self.pending.insert(
            ev.request_id.clone(),
            PendingRequest {
                start: initiator_id,
                end: resource_id,
            },
        );
        Ok(())
    }

    /// Backlink resource → initiator, and record the host that answered.
    /// Responses whose request we never saw are dropped.
    pub fn on_response_received(
        &mut self,
        ev: &EventResponseReceived,
        graph: &mut Graph,
    ) -> Result<()> {
        let Some(request) = self.pending.get(&ev.request_id) else {
            return Ok(());
        };

        let mut edge = Edge::new(
            graph.context(),
            graph::RESPONSE_EDGES,
            request.end.clone(),
            request.start.clone(),
            Some(ev.request_id.as_ref()),
        )
        .prop("status", ev.response.status.to_string());

        if let Some(host) = Node::host(graph.context(), &ev.response) {
            edge = edge.prop("rip", host.id.clone());
            graph.add_node(host)?;
        }
        graph.add_edge(edge)
    }
}

impl Default for NetworkManager {
    fn default() -> Self {
        Self::new()
    }
}
