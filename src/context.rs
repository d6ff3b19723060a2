use rand::distr::Alphanumeric;
use rand::Rng;

/// Length of the audit session identifier.
const SESSION_ID_LEN: usize = 32;

/// Identity of one auditor run, stamped onto every emitted node and edge as
/// `global_session_id`.
///
/// Built once at startup and handed to constructors by shared reference;
/// nothing here is mutable after creation.
#[derive(Debug, Clone)]
pub struct AuditContext {
    session_id: String,
    user_agent: String,
    user_id: String,
}

impl AuditContext {
    pub fn new(user_agent: impl Into<String>) -> Self {
        let session_id: String = rand::rng()
            .sample_iter(Alphanumeric)
            .take(SESSION_ID_LEN)
            .map(char::from)
            .collect();
        Self {
            session_id,
            user_agent: user_agent.into(),
            user_id: user_id_from_env(),
        }
    }

    #[cfg(test)]
    pub fn fixed(session_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            user_agent: "test-agent/1.0 (X11; Linux x86_64)".to_string(),
            user_id: user_id.into(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

/// The container hostname doubles as the user id in deployment; outside a
/// container there is nothing better to key on.
fn user_id_from_env() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "default-user-ID".to_string())
}
