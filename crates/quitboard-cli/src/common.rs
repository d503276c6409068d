//! Shared CLI plumbing: configuration resolution, engine construction,
//! and the console transport.

use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use quitboard_core::{
    storage, ChatTransport, Config, Database, Destination, Engine, MemberId, MembershipStatus,
    MessageId, SubDestination, TransportError,
};

/// Global CLI options that every command needs.
pub struct Context {
    pub config: Option<PathBuf>,
    pub database: Option<PathBuf>,
}

impl Context {
    fn load_config(&self) -> Result<Config, Box<dyn std::error::Error>> {
        match &self.config {
            Some(path) => Ok(Config::load(path)?),
            None => {
                let default = storage::data_dir()?.join("config.toml");
                if default.exists() {
                    Ok(Config::load(&default)?)
                } else {
                    Ok(Config::default())
                }
            }
        }
    }

    /// Build an engine over the resolved database and a console
    /// transport that prints instead of delivering.
    pub fn engine(&self) -> Result<Engine<ConsoleTransport>, Box<dyn std::error::Error>> {
        let config = self.load_config()?;
        let db_path = match (&self.database, &config.database_path) {
            (Some(path), _) => path.clone(),
            (None, Some(path)) => path.clone(),
            (None, None) => storage::data_dir()?.join("quitboard.db"),
        };
        let store = Database::open(&db_path)?;
        Ok(Engine::new(store, ConsoleTransport::default(), config))
    }
}

/// Transport for local runs: sends go to stdout, every member counts as
/// an active group member, and deletes/edits are silent successes.
#[derive(Debug, Default)]
pub struct ConsoleTransport {
    next_id: AtomicI64,
}

#[async_trait]
impl ChatTransport for ConsoleTransport {
    async fn send_message(
        &self,
        destination: Destination,
        _sub_destination: SubDestination,
        text: &str,
    ) -> Result<MessageId, TransportError> {
        println!("[{}]\n{text}\n", destination.0);
        Ok(MessageId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1))
    }

    async fn delete_message(
        &self,
        _destination: Destination,
        _message: MessageId,
    ) -> Result<(), TransportError> {
        Ok(())
    }

    async fn edit_message(
        &self,
        destination: Destination,
        _message: MessageId,
        text: &str,
    ) -> Result<(), TransportError> {
        println!("[{} edited]\n{text}\n", destination.0);
        Ok(())
    }

    async fn query_membership(
        &self,
        _destination: Destination,
        _member: MemberId,
    ) -> Result<MembershipStatus, TransportError> {
        Ok(MembershipStatus::Member)
    }

    async fn grant_limited_privilege(
        &self,
        _destination: Destination,
        member: MemberId,
        label: &str,
    ) -> Result<(), TransportError> {
        println!("[badge] {member} -> {label}");
        Ok(())
    }
}
