//! Canonical topic paths shared by the dashboard and the robot runtime.

/// Authoritative joint telemetry; also carries speculative local edits
/// re-broadcast by the scene (distinguishable via `Event.source`).
pub const JOINT_STATES: &str = "robot.joints";

/// Safety/arming state transitions.
pub const SAFETY: &str = "robot.safety";

/// Parameter value changes.
pub const PARAMS: &str = "robot.params";

/// Actuator target position commands (dashboard -> runtime).
pub const COMMAND_TARGET: &str = "robot.command.target";

/// Named command execution requests (dashboard -> runtime).
pub const COMMAND_EXECUTE: &str = "robot.command.execute";

/// Parameter writes (dashboard -> runtime).
pub const COMMAND_PARAM: &str = "robot.command.param";

/// Query topics; replies arrive on `reply.{correlation_id}`.
pub const QUERY_JOINTS: &str = "robot.query.joints";
pub const QUERY_SAFETY: &str = "robot.query.safety";
pub const QUERY_TOPOLOGY: &str = "robot.query.topology";
pub const QUERY_COMMANDS: &str = "robot.query.commands";
pub const QUERY_PARAMS: &str = "robot.query.params";
