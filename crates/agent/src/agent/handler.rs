//! Request dispatch.
//!
//! [`AgentCore::handle_msg`] is the request engine's public contract:
//! given one decoded request payload it produces exactly one reply buffer.
//! Failure replies are always the single byte `SSH_AGENT_FAILURE`; the
//! [`failure`] helper clears whatever a handler had already composed
//! before the error was discovered.
//!
//! Every request logs its kind, the fingerprints of any keys involved,
//! and the outcome, unless the client suppresses logging, in which case
//! only the outcome line is emitted. Secret material never reaches a log
//! line.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use zeroize::Zeroizing;

use crate::agent::client::ClientInfo;
use crate::agent::codec::{MessageReader, MessageWriter, Rsa1Order};
use crate::agent::crypto;
use crate::agent::key::{self, KeyAlgorithm, Rsa1Key};
use crate::agent::keystore::{AgentKey, KeyStore, KeyVersion};
use crate::agent::message::{
    RequestType, SSH1_AGENT_RSA_IDENTITIES_ANSWER, SSH1_AGENT_RSA_RESPONSE, SSH_AGENT_FAILURE,
    SSH_AGENT_SUCCESS, SSH2_AGENT_IDENTITIES_ANSWER, SSH2_AGENT_SIGN_RESPONSE,
};

/// Handles one request, eventually producing one reply buffer.
///
/// The per-connection driver submits every accepted request through this
/// seam, so alternative implementations (test shims, confirmation
/// wrappers) can sit in front of the real agent.
#[async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    /// Produces the reply for a single request payload.
    ///
    /// `req_index` is the request's slot index on its connection, used
    /// only to correlate log lines.
    async fn handle(&self, client: &ClientInfo, req_index: u64, payload: &[u8]) -> Vec<u8>;
}

/// Constructs a failure reply.
///
/// Clears whatever the handler had partially written, emits the single
/// `SSH_AGENT_FAILURE` byte, and logs the reason (outcome only for
/// suppressed clients).
fn failure(client: &ClientInfo, req: u64, sb: &mut MessageWriter, reason: std::fmt::Arguments<'_>) {
    sb.clear();
    sb.put_byte(SSH_AGENT_FAILURE);
    if client.suppress_logging() {
        client.log_outcome(req, "SSH_AGENT_FAILURE");
    } else {
        client.log_outcome(req, &format!("SSH_AGENT_FAILURE ({})", reason));
    }
}

/// The agent's request engine: the key store plus the dispatch logic.
#[derive(Debug, Default)]
pub struct AgentCore {
    keys: KeyStore,
}

impl AgentCore {
    /// Creates an agent core with an empty key store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The key store, for local (out-of-band) enumeration.
    pub fn keys(&self) -> &KeyStore {
        &self.keys
    }

    /// The key store, for local (out-of-band) key management.
    pub fn keys_mut(&mut self) -> &mut KeyStore {
        &mut self.keys
    }

    /// Dispatches one request payload to the matching operation and
    /// returns the reply buffer.
    pub fn handle_msg(&mut self, client: &ClientInfo, req: u64, payload: &[u8]) -> Vec<u8> {
        let mut msg = MessageReader::new(payload);
        let mut sb = MessageWriter::new();

        let type_byte = msg.get_byte();
        if msg.has_err() {
            failure(client, req, &mut sb, format_args!("message contained no type code"));
            return sb.into_vec();
        }

        match RequestType::from_u8(type_byte) {
            Some(RequestType::RequestRsaIdentities) => {
                self.list_identities(client, req, KeyVersion::V1, &mut sb)
            }
            Some(RequestType::RequestIdentities) => {
                self.list_identities(client, req, KeyVersion::V2, &mut sb)
            }
            Some(RequestType::RsaChallenge) => self.rsa_challenge(client, req, &mut msg, &mut sb),
            Some(RequestType::SignRequest) => self.sign_request(client, req, &mut msg, &mut sb),
            Some(RequestType::AddRsaIdentity) => {
                self.add_rsa_identity(client, req, &mut msg, &mut sb)
            }
            Some(RequestType::AddIdentity) => self.add_identity(client, req, &mut msg, &mut sb),
            Some(RequestType::RemoveRsaIdentity) => {
                self.remove_identity_common(client, req, KeyVersion::V1, &mut msg, &mut sb)
            }
            Some(RequestType::RemoveIdentity) => {
                self.remove_identity_common(client, req, KeyVersion::V2, &mut msg, &mut sb)
            }
            Some(RequestType::RemoveAllRsaIdentities) => {
                self.remove_all(client, req, KeyVersion::V1, &mut sb)
            }
            Some(RequestType::RemoveAllIdentities) => {
                self.remove_all(client, req, KeyVersion::V2, &mut sb)
            }
            None => {
                client.log(req, format_args!("request: unknown message type {}", type_byte));
                failure(client, req, &mut sb, format_args!("unrecognised message"));
            }
        }

        sb.into_vec()
    }

    /// `REQUEST_RSA_IDENTITIES` / `REQUEST_IDENTITIES`.
    ///
    /// Trailing bytes after the type byte are tolerated and ignored.
    fn list_identities(
        &self,
        client: &ClientInfo,
        req: u64,
        version: KeyVersion,
        sb: &mut MessageWriter,
    ) {
        let (request_name, answer_name, answer_tag) = match version {
            KeyVersion::V1 => (
                "SSH1_AGENTC_REQUEST_RSA_IDENTITIES",
                "SSH1_AGENT_RSA_IDENTITIES_ANSWER",
                SSH1_AGENT_RSA_IDENTITIES_ANSWER,
            ),
            KeyVersion::V2 => (
                "SSH2_AGENTC_REQUEST_IDENTITIES",
                "SSH2_AGENT_IDENTITIES_ANSWER",
                SSH2_AGENT_IDENTITIES_ANSWER,
            ),
        };
        client.log(req, format_args!("request: {}", request_name));

        sb.put_byte(answer_tag);
        self.keys.list_serialized(version, sb);

        client.log_outcome(req, answer_name);
        if !client.suppress_logging() {
            for key in self.keys.iter_version(version) {
                match version {
                    KeyVersion::V1 => {
                        client.log(req, format_args!("returned key: {}", key.fingerprint()))
                    }
                    KeyVersion::V2 => client.log(
                        req,
                        format_args!("returned key: {} {}", key.fingerprint(), key.comment()),
                    ),
                }
            }
        }
    }

    /// `SSH1_AGENTC_RSA_CHALLENGE`: decrypt the challenge, hash the
    /// 256-bit result with the session id, return the 16-byte digest.
    fn rsa_challenge(
        &self,
        client: &ClientInfo,
        req: u64,
        msg: &mut MessageReader<'_>,
        sb: &mut MessageWriter,
    ) {
        client.log(req, format_args!("request: SSH1_AGENTC_RSA_CHALLENGE"));

        let reqkey = msg.get_rsa_ssh1_pub(Rsa1Order::ExponentFirst);
        let challenge = msg.get_mp_ssh1().to_vec();
        let session_id = msg.get_data(16).to_vec();
        let response_type = msg.get_uint32();

        if msg.has_err() {
            failure(client, req, sb, format_args!("unable to decode request"));
            return;
        }
        if response_type != 1 {
            failure(
                client,
                req,
                sb,
                format_args!("response type other than 1 not supported"),
            );
            return;
        }

        client.log(
            req,
            format_args!("requested key: {}", key::rsa1_fingerprint(&reqkey)),
        );

        let blob = key::rsa1_public_blob(&reqkey);
        let rsa1 = match self.keys.find(KeyVersion::V1, &blob) {
            Some(AgentKey::Rsa1 { key, .. }) => key,
            _ => {
                failure(client, req, sb, format_args!("key not found"));
                return;
            }
        };

        // The response bytes are secret; only the digest leaves this
        // function.
        let response = Zeroizing::new(rsa1.decrypt_challenge(&challenge));
        let digest = crypto::rsa1_challenge_response(&response, &session_id);

        sb.put_byte(SSH1_AGENT_RSA_RESPONSE);
        sb.put_data(&digest);
        client.log_outcome(req, "SSH1_AGENT_RSA_RESPONSE");
    }

    /// `SSH2_AGENTC_SIGN_REQUEST`.
    fn sign_request(
        &self,
        client: &ClientInfo,
        req: u64,
        msg: &mut MessageReader<'_>,
        sb: &mut MessageWriter,
    ) {
        client.log(req, format_args!("request: SSH2_AGENTC_SIGN_REQUEST"));

        let keyblob = msg.get_string().to_vec();
        let sigdata = msg.get_string().to_vec();
        if msg.has_err() {
            failure(client, req, sb, format_args!("unable to decode request"));
            return;
        }

        // Later protocol revisions appended a flags word to the sign
        // request. Its absence is not an error: a short read here leaves
        // flags at zero.
        let flags = msg.get_uint32();
        let have_flags = !msg.has_err();

        client.log(
            req,
            format_args!("requested key: {}", crypto::sha256_fingerprint(&keyblob)),
        );

        let user_key = match self.keys.find(KeyVersion::V2, &keyblob) {
            Some(AgentKey::User { key, .. }) => key,
            _ => {
                failure(client, req, sb, format_args!("key not found"));
                return;
            }
        };

        if have_flags {
            client.log(req, format_args!("signature flags = {:#010x}", flags));
        } else {
            client.log(req, format_args!("no signature flags"));
        }

        // Any flag bit the algorithm does not advertise must be refused.
        let supported_flags = user_key.supported_flags();
        if flags & !supported_flags != 0 {
            failure(
                client,
                req,
                sb,
                format_args!("unsupported flag bits {:#010x}", flags & !supported_flags),
            );
            return;
        }

        if let Some(reason) = user_key.invalid_for_flags(flags) {
            failure(client, req, sb, format_args!("key invalid: {}", reason));
            return;
        }

        match user_key.sign(&sigdata, flags) {
            Ok(signature) => {
                sb.put_byte(SSH2_AGENT_SIGN_RESPONSE);
                sb.put_string(&signature);
                client.log_outcome(req, "SSH2_AGENT_SIGN_RESPONSE");
            }
            Err(e) => failure(client, req, sb, format_args!("signing failed: {}", e)),
        }
    }

    /// `SSH1_AGENTC_ADD_RSA_IDENTITY`.
    fn add_rsa_identity(
        &mut self,
        client: &ClientInfo,
        req: u64,
        msg: &mut MessageReader<'_>,
        sb: &mut MessageWriter,
    ) {
        client.log(req, format_args!("request: SSH1_AGENTC_ADD_RSA_IDENTITY"));

        let parsed = Rsa1Key::new_private_wire(msg);
        let comment = String::from_utf8_lossy(msg.get_string()).into_owned();

        if msg.has_err() {
            failure(client, req, sb, format_args!("unable to decode request"));
            return;
        }
        let rsa1 = match parsed {
            Some(key) if key.verify() => key,
            _ => {
                failure(client, req, sb, format_args!("key is invalid"));
                return;
            }
        };

        client.log(req, format_args!("submitted key: {}", rsa1.fingerprint()));

        if self.keys.add(AgentKey::Rsa1 { key: rsa1, comment }) {
            sb.put_byte(SSH_AGENT_SUCCESS);
            client.log_outcome(req, "SSH_AGENT_SUCCESS");
        } else {
            // The rejected key is dropped here, zeroizing its secrets.
            failure(client, req, sb, format_args!("key already present"));
        }
    }

    /// `SSH2_AGENTC_ADD_IDENTITY`.
    fn add_identity(
        &mut self,
        client: &ClientInfo,
        req: u64,
        msg: &mut MessageReader<'_>,
        sb: &mut MessageWriter,
    ) {
        client.log(req, format_args!("request: SSH2_AGENTC_ADD_IDENTITY"));

        let alg_name = msg.get_string().to_vec();
        let alg = match KeyAlgorithm::from_name(&alg_name) {
            Some(alg) => alg,
            None => {
                failure(client, req, sb, format_args!("algorithm unknown"));
                return;
            }
        };

        let user_key = match alg.new_private(msg) {
            Some(key) => key,
            None => {
                failure(client, req, sb, format_args!("key setup failed"));
                return;
            }
        };

        let comment = String::from_utf8_lossy(msg.get_string()).into_owned();
        if msg.has_err() {
            failure(client, req, sb, format_args!("unable to decode request"));
            return;
        }

        client.log(
            req,
            format_args!(
                "submitted key: {} {}",
                crypto::sha256_fingerprint(&user_key.public_blob()),
                comment
            ),
        );

        if self.keys.add(AgentKey::User { key: user_key, comment }) {
            sb.put_byte(SSH_AGENT_SUCCESS);
            client.log_outcome(req, "SSH_AGENT_SUCCESS");
        } else {
            failure(client, req, sb, format_args!("key already present"));
        }
    }

    /// `REMOVE_RSA_IDENTITY` / `REMOVE_IDENTITY`.
    fn remove_identity_common(
        &mut self,
        client: &ClientInfo,
        req: u64,
        version: KeyVersion,
        msg: &mut MessageReader<'_>,
        sb: &mut MessageWriter,
    ) {
        let request_name = match version {
            KeyVersion::V1 => "SSH1_AGENTC_REMOVE_RSA_IDENTITY",
            KeyVersion::V2 => "SSH2_AGENTC_REMOVE_IDENTITY",
        };
        client.log(req, format_args!("request: {}", request_name));

        let (blob, fingerprint) = match version {
            KeyVersion::V1 => {
                let reqkey = msg.get_rsa_ssh1_pub(Rsa1Order::ExponentFirst);
                if msg.has_err() {
                    failure(client, req, sb, format_args!("unable to decode request"));
                    return;
                }
                (key::rsa1_public_blob(&reqkey), key::rsa1_fingerprint(&reqkey))
            }
            KeyVersion::V2 => {
                let blob = msg.get_string().to_vec();
                if msg.has_err() {
                    failure(client, req, sb, format_args!("unable to decode request"));
                    return;
                }
                let fingerprint = crypto::sha256_fingerprint(&blob);
                (blob, fingerprint)
            }
        };

        client.log(req, format_args!("unwanted key: {}", fingerprint));

        match self.keys.remove(version, &blob) {
            Some(removed) => {
                client.log(
                    req,
                    format_args!("found with comment: {}", removed.comment()),
                );
                sb.put_byte(SSH_AGENT_SUCCESS);
                client.log_outcome(req, "SSH_AGENT_SUCCESS");
            }
            None => failure(client, req, sb, format_args!("key not found")),
        }
    }

    /// `REMOVE_ALL_RSA_IDENTITIES` / `REMOVE_ALL_IDENTITIES`. Never fails.
    fn remove_all(&mut self, client: &ClientInfo, req: u64, version: KeyVersion, sb: &mut MessageWriter) {
        let request_name = match version {
            KeyVersion::V1 => "SSH1_AGENTC_REMOVE_ALL_RSA_IDENTITIES",
            KeyVersion::V2 => "SSH2_AGENTC_REMOVE_ALL_IDENTITIES",
        };
        client.log(req, format_args!("request: {}", request_name));

        self.keys.remove_all(version);

        sb.put_byte(SSH_AGENT_SUCCESS);
        client.log_outcome(req, "SSH_AGENT_SUCCESS");
    }
}

/// Shared agent: the process-wide request engine behind one async lock.
///
/// Handlers hold the lock for the whole of one request, so key store
/// mutations are linearizable: a handler between suspension points always
/// observes a consistent store.
#[derive(Debug)]
pub struct Agent {
    core: Mutex<AgentCore>,
}

impl Agent {
    /// Creates a shared agent with an empty key store.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            core: Mutex::new(AgentCore::new()),
        })
    }

    /// Locks the core for local (out-of-band) key management.
    pub async fn core(&self) -> tokio::sync::MutexGuard<'_, AgentCore> {
        self.core.lock().await
    }
}

#[async_trait]
impl RequestHandler for Agent {
    async fn handle(&self, client: &ClientInfo, req_index: u64, payload: &[u8]) -> Vec<u8> {
        self.core.lock().await.handle_msg(client, req_index, payload)
    }
}
