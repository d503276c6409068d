//! Chat transport seam.
//!
//! The engine never talks to a chat network directly; it consumes this
//! trait. Implementations live outside the core (bot adapters, the CLI's
//! console transport, recording mocks in tests).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::storage::MemberId;

/// Chat or channel the engine posts into. Direct messages to a member
/// use the member id as the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Destination(pub i64);

impl Destination {
    /// Direct-message destination for one member.
    pub fn direct(member: MemberId) -> Self {
        Self(member.0)
    }
}

/// Optional sub-destination (a topic/thread inside a destination).
///
/// Encoded as 0 in storage when absent so the (destination,
/// sub-destination) pair stays a proper composite key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubDestination(pub Option<i64>);

impl SubDestination {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn topic(id: i64) -> Self {
        Self(Some(id))
    }

    pub(crate) fn encode(self) -> i64 {
        self.0.unwrap_or(0)
    }

    pub(crate) fn decode(raw: i64) -> Self {
        if raw == 0 {
            Self(None)
        } else {
            Self(Some(raw))
        }
    }
}

/// Handle to a sent message, assigned by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub i64);

/// Member standing in a destination group, as reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    /// Group owner. Privilege grants are not attempted against owners.
    Owner,
    Admin,
    Member,
    NotMember,
}

impl MembershipStatus {
    /// Active standing required by the registration commit precondition.
    pub fn is_active(self) -> bool {
        !matches!(self, MembershipStatus::NotMember)
    }
}

/// Every chat backend the engine can drive implements this trait.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Deliver a message; returns the transport-assigned handle.
    async fn send_message(
        &self,
        destination: Destination,
        sub_destination: SubDestination,
        text: &str,
    ) -> Result<MessageId, TransportError>;

    /// Remove a previously sent message.
    async fn delete_message(
        &self,
        destination: Destination,
        message: MessageId,
    ) -> Result<(), TransportError>;

    /// Replace the text of a previously sent message.
    async fn edit_message(
        &self,
        destination: Destination,
        message: MessageId,
        text: &str,
    ) -> Result<(), TransportError>;

    /// Report a member's standing in a destination group.
    async fn query_membership(
        &self,
        destination: Destination,
        member: MemberId,
    ) -> Result<MembershipStatus, TransportError>;

    /// Surface a short tenure badge next to the member's name.
    /// Failures here are always non-fatal to the engine.
    async fn grant_limited_privilege(
        &self,
        destination: Destination,
        member: MemberId,
        label: &str,
    ) -> Result<(), TransportError>;
}

/// Transport that accepts everything and delivers nothing.
///
/// Used by local CLI flows that exercise the engine without a chat
/// backend; every member counts as an active group member.
#[derive(Debug, Default)]
pub struct NullTransport;

#[async_trait]
impl ChatTransport for NullTransport {
    async fn send_message(
        &self,
        _destination: Destination,
        _sub_destination: SubDestination,
        _text: &str,
    ) -> Result<MessageId, TransportError> {
        Ok(MessageId(0))
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
        _destination: Destination,
        _message: MessageId,
        _text: &str,
    ) -> Result<(), TransportError> {
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
        _member: MemberId,
        _label: &str,
    ) -> Result<(), TransportError> {
        Ok(())
    }
}
