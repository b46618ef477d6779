//! NIP-11 Info Responder (C8, §4.8).

use nostr_core::EventStore;
use serde::Serialize;

use crate::config::RelayConfig;

#[derive(Debug, Serialize)]
pub struct RelayInfo {
    pub software: String,
    pub version: String,
    pub supported_nips: Vec<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pubkey: Option<String>,
}

impl RelayInfo {
    /// Builds the document per §4.8: `supported_nips` always includes
    /// 1, 2, 11, plus 9/15/16 when the store/config enable them.
    pub fn build(config: &RelayConfig, store: &dyn EventStore) -> Self {
        let mut nips = vec![1, 2, 11];
        if store.is_nip09() {
            nips.push(9);
        }
        if config.enable_eose {
            nips.push(15);
        }
        if store.is_nip16() {
            nips.push(16);
        }
        nips.sort_unstable();

        Self {
            software: "nostr-relay".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            supported_nips: nips,
            name: config.name.clone(),
            description: config.description.clone(),
            contact: config.contact.clone(),
            pubkey: config.pubkey.clone(),
        }
    }
}
