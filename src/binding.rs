// file: src/binding.rs
// description: mount/unmount adapter exposing reactive connection state

use crate::{
    client::SignalStreamClient,
    client_state::ConnectionSnapshot,
    config::ConnectionConfig,
    error::SignalError,
    types::SignalMessage,
};
use tokio::sync::watch;

/// Ties one client to the lifetime of a consumer (a view, a task, a
/// request handler). Mounting connects exactly once; dropping the binding
/// disconnects, whether or not the stream ever opened.
pub struct SignalBinding {
    client: SignalStreamClient,
    state: watch::Receiver<ConnectionSnapshot>,
}

impl SignalBinding {
    pub fn mount(client: SignalStreamClient) -> Self {
        let state = client.watch();
        client.connect();
        Self { client, state }
    }

    /// Build the client over the default transport and mount it.
    pub fn mount_config(config: ConnectionConfig) -> Result<Self, SignalError> {
        Ok(Self::mount(SignalStreamClient::new(config)?))
    }

    pub fn client(&self) -> &SignalStreamClient {
        &self.client
    }

    pub fn is_connected(&self) -> bool {
        self.state.borrow().is_connected
    }

    pub fn last_message(&self) -> Option<SignalMessage> {
        self.state.borrow().last_message.clone()
    }

    pub fn state(&self) -> ConnectionSnapshot {
        self.state.borrow().clone()
    }

    /// Resolves once `is_connected` flips or a new message lands. Other state
    /// changes (phase, retry counter) do not wake the caller. Returns `None`
    /// if the client is gone.
    pub async fn changed(&mut self) -> Option<ConnectionSnapshot> {
        let (connected, seq) = {
            let current = self.state.borrow_and_update();
            (current.is_connected, current.message_seq)
        };

        loop {
            self.state.changed().await.ok()?;
            let update = {
                let next = self.state.borrow_and_update();
                (next.is_connected != connected || next.message_seq != seq).then(|| next.clone())
            };
            if update.is_some() {
                return update;
            }
        }
    }

    /// Unmount explicitly; same as dropping the binding.
    pub fn unmount(self) {}
}

impl Drop for SignalBinding {
    fn drop(&mut self) {
        self.client.disconnect();
    }
}
