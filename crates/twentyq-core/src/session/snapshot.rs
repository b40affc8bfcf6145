use super::{Session, SessionError, TurnOutput};
use crate::belief::EngineConfig;
use crate::model::{Catalog, History};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Replayable record of a session: its thresholds plus every answer in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(default)]
    pub config: EngineConfig,
    pub history: History,
}

impl SessionSnapshot {
    pub fn capture<R: Rng>(session: &Session<'_, R>) -> Self {
        Self {
            config: *session.config(),
            history: session.history().clone(),
        }
    }

    pub fn to_json<R: Rng>(session: &Session<'_, R>) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&Self::capture(session))
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Rebuilds a session by feeding the recorded answers back one turn at a time.
    ///
    /// Fails with the first turn error, including [`SessionError::Concluded`] if the recorded
    /// history runs past the point where the engine stops.
    pub fn replay<'a, R: Rng>(
        &self,
        catalog: &'a Catalog,
        rng: R,
    ) -> Result<(Session<'a, R>, TurnOutput), SessionError> {
        let mut session = Session::with_config(catalog, self.config, rng);
        let mut turn = session.start()?;
        for observation in self.history.iter() {
            turn = session.submit(Some(*observation))?;
        }
        Ok((session, turn))
    }
}
