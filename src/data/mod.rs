//! This module contains everything relating to [Data].

use std::collections::HashSet;
use std::sync::Arc;

use reqwest::Client;
use serenity::UserId;

use crate::digest::DigestSettings;
use crate::openai::SummaryClient;
use crate::serenity;
use crate::Context;

/// The data kept between shards
pub struct Data {
    /// List of users to send bug notifications
    pub notify_list: HashSet<UserId>,
    /// Everything a digest run needs besides discord access.
    pub digester: Arc<Digester>,
}

/// The non-discord half of the digest pipeline, shared between the daily
/// schedule and the `/digest` command.
pub struct Digester {
    /// Digest destination and channel exclusions.
    pub settings: DigestSettings,
    /// Client for generating summaries.
    pub summarizer: SummaryClient,
}

/// Key to store a [Client] in a [TypeMapKey]
pub struct HttpKey;
impl serenity::prelude::TypeMapKey for HttpKey {
    type Value = Client;
}

/// Is able to get a [Client] out of the serenity type map.
pub trait GetData {
    /// Returns a [Client].
    async fn http_client(&self) -> Client;
}

impl GetData for Context<'_> {
    async fn http_client(&self) -> Client {
        self.serenity_context()
            .data
            .read()
            .await
            .get::<HttpKey>()
            // Client internally uses an Arc, so this is cheap to clone
            .cloned()
            .expect("Expected http client")
    }
}
