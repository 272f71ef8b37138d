//! Program catalog reassembly
//!
//! The program list is the one reply that spans several binary frames. Each
//! fragment's payload is UTF-8 text with one `id<TAB>name` record per line;
//! the final fragment has [`FINAL_FRAGMENT`](crate::frame::FINAL_FRAGMENT)
//! set in its flags byte.

use std::collections::HashMap;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

use crate::error::{ControlError, Result};
use crate::frame::{self, BinaryHeader, FrameKind};
use crate::request::RequestClient;

/// Identifier → name pairs, in order of first appearance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
    complete: bool,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or rename an entry. A known identifier keeps its position.
    pub fn insert(&mut self, id: impl Into<String>, name: impl Into<String>) {
        let id = id.into();
        let name = name.into();
        match self.index.get(&id) {
            Some(&pos) => self.entries[pos].1 = name,
            None => {
                self.index.insert(id.clone(), self.entries.len());
                self.entries.push((id, name));
            }
        }
    }

    /// Name of the program with the given identifier
    pub fn get(&self, id: &str) -> Option<&str> {
        self.index.get(id).map(|&pos| self.entries[pos].1.as_str())
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Identifier of the first program with the given name
    pub fn id_for_name(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, n)| n == name)
            .map(|(id, _)| id.as_str())
    }

    /// Resolve an identifier or a name to an identifier, identifiers first
    pub fn resolve(&self, id_or_name: &str) -> Option<&str> {
        match self.index.get(id_or_name) {
            Some(&pos) => Some(self.entries[pos].0.as_str()),
            None => self.id_for_name(id_or_name),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(id, name)| (id.as_str(), name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the final fragment was received.
    ///
    /// `false` means the device stopped answering part way (or not at all)
    /// and the catalog holds only what arrived before the timeout.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Merge the records of one fragment payload, returning how many were skipped
    pub fn absorb(&mut self, payload: &[u8]) -> usize {
        let mut skipped = 0;
        for record in parse_records(payload) {
            match record {
                Ok((id, name)) => self.insert(id, name),
                Err(e) => {
                    debug!("Skipping catalog record: {}", e);
                    skipped += 1;
                }
            }
        }
        skipped
    }
}

/// Split a fragment payload into `(id, name)` records.
///
/// Each line must be valid UTF-8 holding exactly two tab-separated fields.
pub fn parse_records(payload: &[u8]) -> impl Iterator<Item = Result<(&str, &str)>> {
    payload.split(|&b| b == b'\n').map(|line| {
        let line = std::str::from_utf8(line)
            .map_err(|e| ControlError::MalformedReply(format!("invalid UTF-8: {}", e)))?;

        let mut fields = line.split('\t');
        match (fields.next(), fields.next(), fields.next()) {
            (Some(id), Some(name), None) => Ok((id, name)),
            _ => Err(ControlError::MalformedReply(format!(
                "expected 2 fields in {:?}",
                line
            ))),
        }
    })
}

impl<S> RequestClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Send `command` and reassemble its fragmented binary reply.
    ///
    /// Stops at the final fragment, or returns what it has once a fragment
    /// fails to arrive within the receive timeout.
    pub async fn collect_list(&self, command: &str) -> Result<Catalog> {
        let wait = self.config().recv_timeout;
        let mut connection = self.lock().await;
        connection.flush().await?;
        connection.send_text(command).await?;

        let mut catalog = Catalog::new();
        let mut fragments = 0usize;
        loop {
            let Some(reply) = connection.receive(FrameKind::Binary, wait).await? else {
                if fragments > 0 {
                    warn!(
                        "Catalog truncated: no fragment after {} of them, returning {} entries",
                        fragments,
                        catalog.len()
                    );
                } else {
                    debug!("No catalog reply to {}", command);
                }
                break;
            };

            let Some(data) = reply.as_binary() else {
                continue;
            };
            let Some(header) = BinaryHeader::parse(data) else {
                continue;
            };

            fragments += 1;
            let skipped = catalog.absorb(frame::payload(data));
            if skipped > 0 {
                debug!("Fragment {}: skipped {} record(s)", fragments, skipped);
            }

            if header.is_final() {
                catalog.complete = true;
                break;
            }
        }

        debug!(
            "Catalog assembled from {} fragment(s): {} entries, complete: {}",
            fragments,
            catalog.len(),
            catalog.complete
        );
        Ok(catalog)
    }
}
