//! Shared fixtures: tracing setup and a miniature allocation authority.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use cowrite_client::transport::mock::MockTransport;
use cowrite_client::{
    AgentId, ClientMessage, DType, RegisterSnapshot, ServerMessage, Store, TransportEvent,
};
use cowrite_crdt::{decode_patch, encode_patch, Atom, Id, Op, Pid, Sequence, VersionVector};
use tracing_subscriber::EnvFilter;

/// Installs a test-writer subscriber honouring `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Wraps a patch as the authority would broadcast it.
pub fn patch_msg(key: &str, dtype: DType, is_local: bool, patch: &str) -> ServerMessage {
    ServerMessage::PatchS2C {
        agent_id: None,
        is_local,
        key: key.to_string(),
        dtype: dtype.to_string(),
        patch: patch.to_string(),
    }
}

/// A store over a mock transport that has finished subscribing with an
/// empty snapshot.
pub fn ready_store() -> (Store, Arc<MockTransport>) {
    let transport = Arc::new(MockTransport::new());
    let mut store = Store::new(transport.clone());
    store.handle_event(TransportEvent::Opened).unwrap();
    store
        .handle_message(ServerMessage::ValuesDoneS2C)
        .unwrap();
    transport.take_sent();
    (store, transport)
}

/// Returns the patch carried by every `PatchC2S` in `sent`.
pub fn sent_patches(sent: &[ClientMessage]) -> Vec<String> {
    sent.iter()
        .filter_map(|msg| match msg {
            ClientMessage::PatchC2S { patch, .. } => Some(patch.clone()),
            ClientMessage::SubscribeC2S => None,
        })
        .collect()
}

/// Picks an id path strictly between `prev` and `next`.
pub fn mint_between(prev: Option<&Pid>, next: Option<&Pid>, agent: u32) -> Vec<Id> {
    let mut ids = Vec::new();
    let mut above_prev = prev.is_none();
    let mut below_next = next.is_none();
    let mut depth = 0;
    loop {
        let lo = if above_prev {
            None
        } else {
            prev.and_then(|p| p.ids().get(depth)).copied()
        };
        if lo.is_none() {
            above_prev = true;
        }
        let hi = if below_next {
            None
        } else {
            Some(
                *next
                    .and_then(|p| p.ids().get(depth))
                    .expect("no id path fits between these pids"),
            )
        };

        let candidate = Id::new(lo.map_or(1, |id| id.position + 1), agent);
        match hi {
            Some(hi) if candidate >= hi => {
                let step = lo.unwrap_or(Id::new(0, 0));
                if step < hi {
                    below_next = true;
                }
                ids.push(step);
                depth += 1;
            }
            _ => {
                ids.push(candidate);
                return ids;
            }
        }
    }
}

/// A broadcast produced by the authority for one accepted patch.
#[derive(Debug, Clone)]
pub struct Broadcast {
    pub origin: u32,
    pub key: String,
    pub dtype: DType,
    pub patch: String,
}

/// The server side in miniature: mints Pids, stamps register writes and
/// orders every patch.
#[derive(Debug, Default)]
pub struct Authority {
    next_agent: u32,
    texts: HashMap<String, Sequence<char>>,
    registers: HashMap<String, RegisterSnapshot>,
    clock: VersionVector,
    minted: HashSet<Pid>,
}

impl Authority {
    pub fn new() -> Self {
        Self {
            next_agent: 1,
            ..Default::default()
        }
    }

    /// Seeds a text value with the given atoms.
    pub fn seed_text(&mut self, key: &str, atoms: Vec<Atom<char>>) {
        for atom in &atoms {
            self.minted.insert(atom.pid.clone());
        }
        self.texts
            .insert(key.to_string(), Sequence::from_atoms(atoms));
    }

    pub fn text(&self, key: &str) -> String {
        self.texts.get(key).map(Sequence::as_string).unwrap_or_default()
    }

    /// Assigns ids and returns the subscription response plus snapshot.
    pub fn subscribe(&mut self) -> (u32, Vec<ServerMessage>) {
        let agent = self.next_agent;
        self.next_agent += 1;
        let mut messages = vec![ServerMessage::SubscribeResponseS2C {
            agent_id: AgentId::new(agent),
            client_id: agent,
        }];
        for (key, seq) in &self.texts {
            messages.push(ServerMessage::ValueS2C {
                key: key.clone(),
                dtype: DType::CString.to_string(),
                value: serde_json::to_string(seq.as_slice()).unwrap(),
            });
        }
        for (key, register) in &self.registers {
            messages.push(ServerMessage::ValueS2C {
                key: key.clone(),
                dtype: DType::CRegister.to_string(),
                value: register.encode().unwrap(),
            });
        }
        messages.push(ServerMessage::ValuesDoneS2C);
        (agent, messages)
    }

    /// Accepts one client message, returning what to broadcast.
    pub fn accept(&mut self, agent: u32, message: ClientMessage) -> Option<Broadcast> {
        let ClientMessage::PatchC2S { key, dtype, patch } = message else {
            return None;
        };
        let dtype: DType = dtype.parse().unwrap();
        let patch = match dtype {
            DType::CString => self.accept_text(agent, &key, &patch),
            DType::CRegister => self.accept_register(agent, &key, &patch),
            DType::Delete => panic!("delete patches are not supported"),
        };
        Some(Broadcast {
            origin: agent,
            key,
            dtype,
            patch,
        })
    }

    fn accept_text(&mut self, agent: u32, key: &str, patch: &str) -> String {
        let seq = self.texts.entry(key.to_string()).or_default();
        let mut out = Vec::new();
        for op in decode_patch(patch).unwrap() {
            match op {
                Op::Delete { pid } => {
                    if seq.apply_delete(&pid).is_some() {
                        out.push(Op::Delete { pid });
                    }
                }
                Op::ClientInsert {
                    prev_pid,
                    next_pid,
                    value,
                } => {
                    let mut prev = prev_pid;
                    for ch in value.chars() {
                        // Pids are never reused, even after a delete.
                        let mut lower = prev.clone();
                        let pid = loop {
                            let ids = mint_between(lower.as_ref(), next_pid.as_ref(), agent);
                            let pid = Pid::new(ids, 0).unwrap();
                            if self.minted.insert(pid.clone()) {
                                break pid;
                            }
                            lower = Some(pid);
                        };
                        seq.apply_insert(pid.clone(), ch);
                        out.push(Op::Insert {
                            pid: pid.clone(),
                            value: ch,
                        });
                        prev = Some(pid);
                    }
                }
                Op::Insert { .. } => panic!("clients never send authoritative inserts"),
            }
        }
        encode_patch(&out)
    }

    fn accept_register(&mut self, agent: u32, key: &str, patch: &str) -> String {
        let val: serde_json::Value = serde_json::from_str(patch).unwrap();
        let agent_id = AgentId::new(agent);
        self.clock
            .put(agent_id, self.clock.get(agent_id).unwrap_or(0) + 1);
        let record = RegisterSnapshot {
            agent_id,
            vec: Some(self.clock.clone()),
            time: Some(Utc::now()),
            val,
        };
        let current = self.registers.entry(key.to_string()).or_default();
        if record.supersedes(current) {
            *current = record.clone();
        }
        record.encode().unwrap()
    }
}

/// One subscribed client.
pub struct Client {
    pub agent: u32,
    pub store: Store,
    pub transport: Arc<MockTransport>,
}

/// An authority with several subscribed clients.
pub struct Harness {
    pub authority: Authority,
    pub clients: Vec<Client>,
}

impl Harness {
    pub fn new(clients: usize) -> Self {
        Self::with_authority(Authority::new(), clients)
    }

    pub fn with_authority(authority: Authority, clients: usize) -> Self {
        let mut harness = Self {
            authority,
            clients: Vec::new(),
        };
        for _ in 0..clients {
            harness.connect();
        }
        harness
    }

    /// Connects and subscribes one more client.
    pub fn connect(&mut self) -> usize {
        let transport = Arc::new(MockTransport::new());
        let mut store = Store::new(transport.clone());
        store.handle_event(TransportEvent::Opened).unwrap();
        assert_eq!(transport.take_sent(), vec![ClientMessage::SubscribeC2S]);
        let (agent, messages) = self.authority.subscribe();
        for message in messages {
            store.handle_message(message).unwrap();
        }
        self.clients.push(Client {
            agent,
            store,
            transport,
        });
        self.clients.len() - 1
    }

    /// Forwards outbound patches of the given clients, in that order, to
    /// the authority and delivers every broadcast to every client.
    pub fn pump_from(&mut self, order: &[usize]) {
        for &i in order {
            let agent = self.clients[i].agent;
            for message in self.clients[i].transport.take_sent() {
                if let Some(broadcast) = self.authority.accept(agent, message) {
                    self.deliver(&broadcast);
                }
            }
        }
    }

    /// Pumps every client until nothing is left to send.
    pub fn pump(&mut self) {
        let all: Vec<usize> = (0..self.clients.len()).collect();
        while self.clients.iter().any(|c| !c.transport.sent().is_empty()) {
            self.pump_from(&all);
        }
    }

    fn deliver(&mut self, broadcast: &Broadcast) {
        for client in &mut self.clients {
            client
                .store
                .handle_message(ServerMessage::PatchS2C {
                    agent_id: Some(AgentId::new(broadcast.origin)),
                    is_local: client.agent == broadcast.origin,
                    key: broadcast.key.clone(),
                    dtype: broadcast.dtype.to_string(),
                    patch: broadcast.patch.clone(),
                })
                .unwrap();
        }
    }

    pub fn text(&self, client: usize, key: &str) -> String {
        self.clients[client]
            .store
            .get(key, Some(DType::CString))
            .unwrap()
            .as_text()
            .unwrap()
            .text()
            .to_string()
    }
}
