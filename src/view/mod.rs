//! Stateful, re-renderable views bound to one remote message.
//!
//! A [`View`] value is the immutable props; its associated `State` is replaced
//! wholesale on every update. Views render into a [`Frame`], whose controls
//! carry handlers that are bound into a [`HandlerArena`] on commit.

mod arena;
pub mod differ;
mod error;
mod frame;
mod instance;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub use arena::HandlerArena;
pub use differ::{Drift, content_matches, diff};
pub use error::ViewError;
pub use frame::{Button, Control, Frame, Handler, HandlerContext, HandlerOutcome, Row, Select};
pub use instance::{Followup, LiveView, ViewInstance};

/// Result of decoding a persisted view.
pub enum Restored<V: View> {
    Current {
        props: V,
        state: V::State,
        generation: u64,
    },
    /// Written by a schema version this build no longer understands.
    Obsolete { found: u32 },
}

#[async_trait]
pub trait View: Serialize + DeserializeOwned + Send + Sync + 'static {
    type State: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;

    /// Stable identifier used to find the right type when rehydrating.
    const TYPE_ID: &'static str;

    /// Bump when the serialized props or state change incompatibly.
    const SCHEMA_VERSION: u32 = 1;

    fn initial_state(&self) -> Self::State;

    async fn render(&self, state: &Self::State) -> Result<Frame<Self>, ViewError>;

    /// Runs when the view leaves memory. Failures are logged.
    async fn before_evict(&self, _state: &Self::State) -> Result<(), ViewError> {
        Ok(())
    }

    fn serialize_state(&self, state: &Self::State, generation: u64) -> Result<String, ViewError> {
        let envelope = EnvelopeRef {
            version: Self::SCHEMA_VERSION,
            generation,
            props: self,
            state,
        };
        Ok(serde_json::to_string(&envelope)?)
    }

    /// Decode what [`View::serialize_state`] wrote. The version is checked
    /// before the body is parsed, so an obsolete body never has to match the
    /// current types.
    fn deserialize_state(raw: &str) -> Result<Restored<Self>, ViewError> {
        let header: Header = serde_json::from_str(raw)?;
        if header.version != Self::SCHEMA_VERSION {
            return Ok(Restored::Obsolete {
                found: header.version,
            });
        }
        let envelope: Envelope<Self, Self::State> = serde_json::from_str(raw)?;
        Ok(Restored::Current {
            props: envelope.props,
            state: envelope.state,
            generation: envelope.generation,
        })
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a, P, S> {
    version: u32,
    generation: u64,
    props: &'a P,
    state: &'a S,
}

#[derive(Deserialize)]
struct Header {
    version: u32,
}

#[derive(Deserialize)]
struct Envelope<P, S> {
    generation: u64,
    props: P,
    state: S,
}
