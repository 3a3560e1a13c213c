//! Reference-counted channel subscriptions.
//!
//! Several consumers may watch the same organization over one connection.
//! The registry counts them so that the server sees exactly one `SUBSCRIBE`
//! when the first consumer arrives and one `UNSUBSCRIBE` when the last one
//! leaves.

use std::collections::HashMap;

use navbat_server::domain::OrganizationId;
use tokio::sync::mpsc;

use crate::connection::manager::Command;

/// Channel -> number of consumers. Counts are always positive.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    counts: HashMap<OrganizationId, usize>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when this is the first consumer (a `SUBSCRIBE` is due).
    pub fn acquire(&mut self, channel: OrganizationId) -> bool {
        let count = self.counts.entry(channel).or_insert(0);
        *count += 1;
        *count == 1
    }

    /// Returns `true` when this was the last consumer (an `UNSUBSCRIBE` is due).
    ///
    /// Releasing a channel nobody holds is a no-op.
    pub fn release(&mut self, channel: &OrganizationId) -> bool {
        match self.counts.get_mut(channel) {
            Some(count) if *count > 1 => {
                *count -= 1;
                false
            }
            Some(_) => {
                self.counts.remove(channel);
                true
            }
            None => {
                tracing::warn!(organization_id = %channel, "Release of a channel that is not held");
                false
            }
        }
    }

    /// Every channel with at least one consumer, sorted.
    pub fn channels(&self) -> Vec<OrganizationId> {
        let mut channels: Vec<_> = self.counts.keys().cloned().collect();
        channels.sort();
        channels
    }

    pub fn count(&self, channel: &OrganizationId) -> usize {
        self.counts.get(channel).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// A consumer's hold on a channel. Dropping it releases the channel.
#[derive(Debug)]
pub struct ChannelSubscription {
    channel: OrganizationId,
    commands: mpsc::UnboundedSender<Command>,
}

impl ChannelSubscription {
    pub(crate) fn new(channel: OrganizationId, commands: mpsc::UnboundedSender<Command>) -> Self {
        Self { channel, commands }
    }

    pub fn channel(&self) -> &OrganizationId {
        &self.channel
    }
}

impl Drop for ChannelSubscription {
    fn drop(&mut self) {
        // the manager may already be gone on shutdown
        let _ = self.commands.send(Command::Release(self.channel.clone()));
    }
}
