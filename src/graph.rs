use sha2::{Digest, Sha256};
use url::Url;

use chromaudit_cdp::debugger::ScriptId;
use chromaudit_cdp::network::{self, LoaderId, RequestId};
use chromaudit_cdp::page::FrameId;

use crate::context::AuditContext;
use crate::error::Result;
use crate::writer::RelationWriter;

// One output relation per label.
pub const FRAMES: &str = "frames";
pub const SCRIPTS: &str = "scripts";
pub const PARSER: &str = "parser";
pub const RESOURCES: &str = "resources";
pub const HOSTS: &str = "hosts";
pub const DOWNLOAD: &str = "download";
pub const FRAME_EDGES: &str = "frame-edges";
pub const FRAME_ATTACHED: &str = "frame-attached";
pub const NAVIGATION_EDGES: &str = "navigation-edges";
pub const REQUEST_EDGES: &str = "request-edges";
pub const RESPONSE_EDGES: &str = "response-edges";
pub const REDIRECT: &str = "redirect";
pub const USER: &str = "user";
pub const SESSION: &str = "session";
pub const STARTED: &str = "started";
pub const CREATED: &str = "created";
pub const OPENED: &str = "opened";

/// Placeholder for attributes that are not (yet) known. A later sighting of
/// the same entity may upgrade it, see the writer's merge rule.
pub const NONE: &str = "None";

/// A node row: identity plus a flat property bag. Properties always lead
/// with `id` and `global_session_id`.
#[derive(Debug, Clone)]
pub struct Node {
    pub label: &'static str,
    pub id: String,
    pub props: Vec<(String, String)>,
}

impl Node {
    fn new(ctx: &AuditContext, label: &'static str, id: String) -> Self {
        let props = vec![
            ("id".to_string(), id.clone()),
            ("global_session_id".to_string(), ctx.session_id().to_string()),
        ];
        Self { label, id, props }
    }

    pub fn prop(mut self, key: &str, value: impl Into<String>) -> Self {
        self.props.push((key.to_string(), value.into()));
        self
    }

    /// A frame under one specific loader; the engine owns the attribute set.
    pub fn frame(ctx: &AuditContext, composite_id: String) -> Self {
        Node::new(ctx, FRAMES, composite_id)
    }

    /// The composite id a script is known under: `scriptId-frameId-loaderId`.
    pub fn script_id(script_id: &str, frame_id: &FrameId, loader_id: &str) -> String {
        format!("{}-{}-{}", script_id, frame_id, loader_id)
    }

    pub fn script(
        ctx: &AuditContext,
        script_id: &ScriptId,
        frame_id: &FrameId,
        loader_id: &str,
    ) -> Self {
        Node::new(
            ctx,
            SCRIPTS,
            Self::script_id(script_id.as_ref(), frame_id, loader_id),
        )
        .prop("frameId", frame_id.as_ref())
        .prop("loaderId", loader_id)
        .prop("scriptId", script_id.as_ref())
    }

    /// The HTML parser acting as a request initiator, one per document load.
    pub fn parser(ctx: &AuditContext, frame_id: &FrameId, loader_id: &LoaderId) -> Self {
        let id = format!("parser-{}-{}", frame_id, loader_id);
        let node = Node::new(ctx, PARSER, id.clone())
            .prop("frameId", frame_id.as_ref())
            .prop("loaderId", loader_id.as_ref());
        node.prop("scriptId", id)
    }

    /// A fetched endpoint, identified by the SHA-256 of `netloc/path`. The
    /// query string is dropped on purpose so replays of the same endpoint
    /// collapse into one node.
    pub fn resource(ctx: &AuditContext, raw_url: &str, resource_type: &str) -> Self {
        let (domain, path) = split_url(raw_url);
        let hashed = hex::encode(Sha256::digest(format!("{domain}{path}").as_bytes()));
        Node::new(ctx, RESOURCES, hashed)
            .prop("path", path)
            .prop("type", resource_type)
            .prop("domain", domain)
    }

    /// The remote endpoint a response came from. `None` when the response
    /// carries no remote address (cache hits, data: urls).
    pub fn host(ctx: &AuditContext, response: &network::Response) -> Option<Self> {
        let rip = response.remote_ip_address.as_deref().filter(|ip| !ip.is_empty())?;
        let (domain, _) = split_url(&response.url);
        let server = response
            .headers
            .get_ignore_case("server")
            .unwrap_or(NONE)
            .to_string();
        Some(
            Node::new(ctx, HOSTS, rip.to_string())
                .prop("rip", rip)
                .prop("domain", domain)
                .prop("server", server),
        )
    }

    pub fn user(ctx: &AuditContext) -> Self {
        Node::new(ctx, USER, ctx.user_id().to_string())
    }

    pub fn session(ctx: &AuditContext) -> Self {
        Node::new(ctx, SESSION, ctx.session_id().to_string())
            .prop("user-agent", ctx.user_agent().replace(';', ":"))
    }

    /// A top-level document load replaced by a script-initiated one.
    pub fn redirect_record(
        ctx: &AuditContext,
        old_loader: &LoaderId,
        new_loader: &LoaderId,
        frame_id: &FrameId,
        script_id: &ScriptId,
        request_id: &RequestId,
    ) -> Self {
        let id = format!("{}-{}", old_loader, request_id);
        Node::new(ctx, REDIRECT, id)
            .prop("scriptId", script_id.as_ref())
            .prop("oldLoaderId", old_loader.as_ref())
            .prop("newLoaderId", new_loader.as_ref())
            .prop("frameId", frame_id.as_ref())
    }
}

/// An edge row between two node ids. Properties always lead with `start`,
/// `end` and `global_session_id`.
#[derive(Debug, Clone)]
pub struct Edge {
    pub label: &'static str,
    /// Dedup key inside the label's table.
    pub key: String,
    pub props: Vec<(String, String)>,
}

impl Edge {
    pub fn new(
        ctx: &AuditContext,
        label: &'static str,
        start: impl Into<String>,
        end: impl Into<String>,
        id: Option<&str>,
    ) -> Self {
        let start = start.into();
        let end = end.into();
        let key = format!("{}-{}:{}->{}", label, id.unwrap_or(NONE), start, end);
        let props = vec![
            ("start".to_string(), start),
            ("end".to_string(), end),
            ("global_session_id".to_string(), ctx.session_id().to_string()),
        ];
        Self { label, key, props }
    }

    pub fn prop(mut self, key: &str, value: impl Into<String>) -> Self {
        self.props.push((key.to_string(), value.into()));
        self
    }

    pub fn opt_prop(self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.prop(key, value),
            None => self,
        }
    }

    /// A file landing on disk, from the frame that triggered it to the path
    /// on the remote server it came from.
    pub fn download(ctx: &AuditContext, frame_composite_id: &str, raw_url: &str) -> Self {
        let (domain, path) = split_url(raw_url);
        Edge::new(ctx, DOWNLOAD, frame_composite_id, path.clone(), None)
            .prop("domain", domain)
            .prop("path", path)
    }
}

/// Materializes nodes and edges into the relation writer, stamping the audit
/// session onto every row.
pub struct Graph {
    ctx: AuditContext,
    writer: RelationWriter,
}

impl Graph {
    pub fn new(ctx: AuditContext, writer: RelationWriter) -> Self {
        Self { ctx, writer }
    }

    pub fn context(&self) -> &AuditContext {
        &self.ctx
    }

    pub fn add_node(&mut self, node: Node) -> Result<()> {
        self.writer.add(node.label, &node.id, node.props)
    }

    pub fn add_edge(&mut self, edge: Edge) -> Result<()> {
        self.writer.add(edge.label, &edge.key, edge.props)
    }

    /// Emit the one-per-run rows: the session, the invoking user and the
    /// `started` edge between them.
    pub fn record_session_start(&mut self) -> Result<()> {
        let session = Node::session(&self.ctx);
        let user = Node::user(&self.ctx);
        let started = Edge::new(
            &self.ctx,
            STARTED,
            self.ctx.user_id(),
            self.ctx.session_id(),
            None,
        );
        self.add_node(session)?;
        self.add_node(user)?;
        self.add_edge(started)
    }

    pub fn flush_all(&mut self) -> Result<()> {
        self.writer.flush_all()
    }
}

/// `https://a:8080/x/y?q=1` → (`a:8080`, `/x/y`), the same split
/// `urlparse` gives: host with port, path without query.
fn split_url(raw: &str) -> (String, String) {
    match Url::parse(raw) {
        Ok(url) => {
            let domain = match (url.host_str(), url.port()) {
                (Some(host), Some(port)) => format!("{host}:{port}"),
                (Some(host), None) => host.to_string(),
                (None, _) => String::new(),
            };
            (domain, url.path().to_string())
        }
        Err(_) => (String::new(), raw.to_string()),
    }
}
