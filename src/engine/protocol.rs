//! Result lines printed by the engine-side pipeline script.
//!
//! Every script invocation prints exactly one line of the form
//! `@@VRMBATCH {"ok": true, "data": {...}}` or
//! `@@VRMBATCH {"ok": false, "kind": "context", "message": "..."}` on stdout.
//! Everything else on stdout/stderr is engine chatter and only logged.

use super::{EngineError, EngineVersion, RiggingSupport, SceneObjects};
use serde::Deserialize;
use serde_json::Value;

pub const RESULT_PREFIX: &str = "@@VRMBATCH ";

/// Error categories the script can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    Import,
    Context,
    RiggingUnavailable,
    Rig,
    Export,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptReply {
    pub ok: bool,
    #[serde(default)]
    pub kind: Option<ReplyKind>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Value,
}

impl ScriptReply {
    pub fn kind(&self) -> ReplyKind {
        self.kind.unwrap_or(ReplyKind::Other)
    }
}

/// Find and decode the last result line in the script output.
pub fn parse_reply(stdout: &str) -> Result<ScriptReply, EngineError> {
    let line = stdout
        .lines()
        .rev()
        .find_map(|line| line.trim_start().strip_prefix(RESULT_PREFIX))
        .ok_or_else(|| EngineError::Protocol("script printed no result line".to_string()))?;

    serde_json::from_str(line.trim())
        .map_err(|e| EngineError::Protocol(format!("malformed result line: {}", e)))
}

#[derive(Debug, Deserialize)]
struct ProbeData {
    engine_version: Vec<u32>,
    #[serde(default)]
    rigging_available: bool,
    #[serde(default)]
    rigging_min_version: Option<Vec<u32>>,
}

/// Decode the `data` of a `probe` reply.
pub fn rigging_support_from(data: Value) -> Result<RiggingSupport, EngineError> {
    let probe: ProbeData = serde_json::from_value(data)
        .map_err(|e| EngineError::Protocol(format!("bad probe data: {}", e)))?;

    let engine_version = EngineVersion::from_parts(&probe.engine_version).ok_or_else(|| {
        EngineError::Protocol(format!("bad engine version {:?}", probe.engine_version))
    })?;

    // An unreadable minimum is treated as no declared minimum
    let min_engine_version = probe
        .rigging_min_version
        .as_deref()
        .and_then(EngineVersion::from_parts);

    Ok(RiggingSupport {
        available: probe.rigging_available,
        engine_version,
        min_engine_version,
    })
}

/// Decode the `data` of a `prepare` reply.
pub fn scene_objects_from(data: Value) -> Result<SceneObjects, EngineError> {
    serde_json::from_value(data)
        .map_err(|e| EngineError::Protocol(format!("bad prepare data: {}", e)))
}
