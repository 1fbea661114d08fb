//! Inbound autopilot commands.
//!
//! Commands arrive as `{"action": "...", "value": ...}` objects. They are
//! decoded once into the closed [`Command`] enum and dispatched with an
//! exhaustive match, so every action either has a handler or is explicitly
//! unsupported.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::broadcast::BroadcastTimer;
use crate::error::AutopilotError;
use crate::state::Autopilot;
use crate::store::DataStore;

/// Command object as received from the ingress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// A decoded autopilot command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Change engagement state; the name is kept verbatim for error messages
    SetState(String),
    /// Adjust the target heading by a signed number of degrees
    ChangeHeading(f64),
    AdvanceWaypoint,
    SilenceAlarm,
    /// Any other action
    Unknown(String),
}

impl TryFrom<CommandRequest> for Command {
    type Error = AutopilotError;

    fn try_from(request: CommandRequest) -> Result<Self, Self::Error> {
        let invalid = || AutopilotError::InvalidCommand(request.action.clone());
        match request.action.as_str() {
            "setState" => match &request.value {
                Some(Value::String(state)) => Ok(Command::SetState(state.clone())),
                _ => Err(invalid()),
            },
            "changeHeading" => match &request.value {
                Some(Value::Number(n)) => {
                    n.as_f64().map(Command::ChangeHeading).ok_or_else(invalid)
                }
                Some(Value::String(s)) => s
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|d| d.is_finite())
                    .map(Command::ChangeHeading)
                    .ok_or_else(invalid),
                _ => Err(invalid()),
            },
            "advanceWaypoint" => Ok(Command::AdvanceWaypoint),
            "silenceAlarm" => Ok(Command::SilenceAlarm),
            other => Ok(Command::Unknown(other.to_string())),
        }
    }
}

impl Command {
    /// Decode a command from its JSON object form
    pub fn from_json(value: Value) -> Result<Self, AutopilotError> {
        let request: CommandRequest = serde_json::from_value(value)
            .map_err(|_| AutopilotError::InvalidCommand("command".to_string()))?;
        request.try_into()
    }
}

/// Route a command to the autopilot.
///
/// Heading changes always succeed from the caller's point of view; while
/// disengaged they are silently ignored.
pub fn dispatch<S: DataStore, T: BroadcastTimer>(
    autopilot: &mut Autopilot<S, T>,
    command: Command,
) -> Result<(), AutopilotError> {
    match command {
        Command::SetState(state) => autopilot.request_state(&state),
        Command::ChangeHeading(delta) => {
            autopilot.adjust_heading(delta);
            Ok(())
        }
        Command::AdvanceWaypoint | Command::SilenceAlarm | Command::Unknown(_) => {
            Err(AutopilotError::UnsupportedCommand)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::angle::degs_to_rads;
    use crate::broadcast::ManualTimer;
    use crate::heading::HeadingReference;
    use crate::state::EngagementState;
    use crate::store::{paths, MemoryStore};
    use serde_json::json;

    fn engaged_autopilot() -> Autopilot<MemoryStore, ManualTimer> {
        let mut store = MemoryStore::new();
        store.publish(paths::HEADING_TRUE, json!(degs_to_rads(100.0)));
        let mut ap = Autopilot::new(store, ManualTimer::new());
        ap.request_state("auto").unwrap();
        ap
    }

    #[test]
    fn test_decode_commands() {
        assert_eq!(
            Command::from_json(json!({"action": "setState", "value": "auto"})),
            Ok(Command::SetState("auto".to_string()))
        );
        assert_eq!(
            Command::from_json(json!({"action": "changeHeading", "value": -10})),
            Ok(Command::ChangeHeading(-10.0))
        );
        assert_eq!(
            Command::from_json(json!({"action": "changeHeading", "value": "1.5"})),
            Ok(Command::ChangeHeading(1.5))
        );
        assert_eq!(
            Command::from_json(json!({"action": "advanceWaypoint"})),
            Ok(Command::AdvanceWaypoint)
        );
        assert_eq!(
            Command::from_json(json!({"action": "silenceAlarm", "value": 1})),
            Ok(Command::SilenceAlarm)
        );
        assert_eq!(
            Command::from_json(json!({"action": "tack", "value": "port"})),
            Ok(Command::Unknown("tack".to_string()))
        );
    }

    #[test]
    fn test_decode_invalid_values() {
        assert_eq!(
            Command::from_json(json!({"action": "changeHeading", "value": "ten"})),
            Err(AutopilotError::InvalidCommand("changeHeading".to_string()))
        );
        assert_eq!(
            Command::from_json(json!({"action": "setState"}))
                .unwrap_err()
                .to_string(),
            "invalid value for setState"
        );
        assert!(Command::from_json(json!({"value": 1})).is_err());
    }

    #[test]
    fn test_unsupported_commands_in_any_state() {
        let mut ap = Autopilot::new(MemoryStore::new(), ManualTimer::new());
        let unsupported = || {
            [
                Command::AdvanceWaypoint,
                Command::SilenceAlarm,
                Command::Unknown("tack".to_string()),
            ]
        };
        for command in unsupported() {
            let err = dispatch(&mut ap, command).unwrap_err();
            assert_eq!(err.to_string(), "not supported");
        }

        ap.store_mut()
            .publish(paths::HEADING_MAGNETIC, json!(degs_to_rads(3.0)));
        ap.request_state("auto").unwrap();
        for command in unsupported() {
            assert_eq!(
                dispatch(&mut ap, command),
                Err(AutopilotError::UnsupportedCommand)
            );
        }
        assert_eq!(ap.state(), EngagementState::Auto);
    }

    #[test]
    fn test_dispatch_set_state() {
        let mut ap = Autopilot::new(MemoryStore::new(), ManualTimer::new());
        assert_eq!(
            dispatch(&mut ap, Command::SetState("auto".to_string())),
            Err(AutopilotError::UnknownCurrentHeading)
        );
        assert_eq!(
            dispatch(&mut ap, Command::SetState("wind".to_string()))
                .unwrap_err()
                .to_string(),
            "wind not supported"
        );
    }

    #[test]
    fn test_dispatch_change_heading() {
        let mut ap = engaged_autopilot();
        assert_eq!(dispatch(&mut ap, Command::ChangeHeading(10.0)), Ok(()));
        let t = ap.targets().get(HeadingReference::True).unwrap();
        assert!((t.degrees() - 110.0).abs() < 1e-9);

        dispatch(&mut ap, Command::SetState("standby".to_string())).unwrap();
        assert_eq!(dispatch(&mut ap, Command::ChangeHeading(10.0)), Ok(()));
        assert!(ap.targets().is_empty());
    }
}
