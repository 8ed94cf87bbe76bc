//! SSH agent protocol message types.
//!
//! This module defines the request and reply tags of the SSH agent
//! protocol, covering both the legacy SSH-1 RSA agent messages and the
//! SSH-2 agent messages.
//!
//! # Message Categories
//!
//! - **Generic replies** (5-6): failure, success
//! - **SSH-1 requests/replies** (1-4, 7-9): RSA identities, challenge
//! - **SSH-2 requests/replies** (11-19): identities, sign, add/remove
//!
//! # Example
//!
//! ```rust
//! use vigil_agent::agent::message::RequestType;
//!
//! let req = RequestType::SignRequest;
//! assert_eq!(req as u8, 13);
//! ```

/// Reply tag: the request failed. Failure replies are always exactly one
/// byte long.
pub const SSH_AGENT_FAILURE: u8 = 5;

/// Reply tag: the request succeeded and carries no further body.
pub const SSH_AGENT_SUCCESS: u8 = 6;

/// Reply tag for [`RequestType::RequestRsaIdentities`].
pub const SSH1_AGENT_RSA_IDENTITIES_ANSWER: u8 = 2;

/// Reply tag for [`RequestType::RsaChallenge`].
pub const SSH1_AGENT_RSA_RESPONSE: u8 = 4;

/// Reply tag for [`RequestType::RequestIdentities`].
pub const SSH2_AGENT_IDENTITIES_ANSWER: u8 = 12;

/// Reply tag for [`RequestType::SignRequest`].
pub const SSH2_AGENT_SIGN_RESPONSE: u8 = 14;

/// SSH agent request types.
///
/// Each request type has a unique numeric identifier used as the first
/// payload byte of a framed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RequestType {
    // SSH-1 (1-9)
    /// List all SSH-1 RSA keys.
    RequestRsaIdentities = 1,
    /// Decrypt an RSA challenge and return the hashed response.
    RsaChallenge = 3,
    /// Add an SSH-1 RSA key.
    AddRsaIdentity = 7,
    /// Remove one SSH-1 RSA key.
    RemoveRsaIdentity = 8,
    /// Remove every SSH-1 RSA key.
    RemoveAllRsaIdentities = 9,

    // SSH-2 (11-19)
    /// List all SSH-2 keys.
    RequestIdentities = 11,
    /// Sign data with a held SSH-2 key.
    SignRequest = 13,
    /// Add an SSH-2 key.
    AddIdentity = 17,
    /// Remove one SSH-2 key.
    RemoveIdentity = 18,
    /// Remove every SSH-2 key.
    RemoveAllIdentities = 19,
}

impl RequestType {
    /// Converts a type byte to a request type.
    ///
    /// Returns `None` for tags the agent does not recognise; the handler
    /// answers those with `SSH_AGENT_FAILURE`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use vigil_agent::agent::message::RequestType;
    ///
    /// assert_eq!(RequestType::from_u8(11), Some(RequestType::RequestIdentities));
    /// assert_eq!(RequestType::from_u8(255), None);
    /// ```
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(RequestType::RequestRsaIdentities),
            3 => Some(RequestType::RsaChallenge),
            7 => Some(RequestType::AddRsaIdentity),
            8 => Some(RequestType::RemoveRsaIdentity),
            9 => Some(RequestType::RemoveAllRsaIdentities),
            11 => Some(RequestType::RequestIdentities),
            13 => Some(RequestType::SignRequest),
            17 => Some(RequestType::AddIdentity),
            18 => Some(RequestType::RemoveIdentity),
            19 => Some(RequestType::RemoveAllIdentities),
            _ => None,
        }
    }

    /// Returns the protocol name of this request type.
    pub fn name(&self) -> &'static str {
        match self {
            RequestType::RequestRsaIdentities => "SSH1_AGENTC_REQUEST_RSA_IDENTITIES",
            RequestType::RsaChallenge => "SSH1_AGENTC_RSA_CHALLENGE",
            RequestType::AddRsaIdentity => "SSH1_AGENTC_ADD_RSA_IDENTITY",
            RequestType::RemoveRsaIdentity => "SSH1_AGENTC_REMOVE_RSA_IDENTITY",
            RequestType::RemoveAllRsaIdentities => "SSH1_AGENTC_REMOVE_ALL_RSA_IDENTITIES",
            RequestType::RequestIdentities => "SSH2_AGENTC_REQUEST_IDENTITIES",
            RequestType::SignRequest => "SSH2_AGENTC_SIGN_REQUEST",
            RequestType::AddIdentity => "SSH2_AGENTC_ADD_IDENTITY",
            RequestType::RemoveIdentity => "SSH2_AGENTC_REMOVE_IDENTITY",
            RequestType::RemoveAllIdentities => "SSH2_AGENTC_REMOVE_ALL_IDENTITIES",
        }
    }
}

impl std::fmt::Display for RequestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name(), *self as u8)
    }
}
