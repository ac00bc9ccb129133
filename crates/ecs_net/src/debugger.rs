//! Debugger control channel: a remote tool attaches over TCP and sends
//! newline-delimited, text-tagged commands to drive the simulation loop
//! (§6). The session itself is a small state machine over
//! `run`/`pause`/`update`/`close`/`disconnect`.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::error::NetError;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum DebuggerCommand {
    /// Resume ticking the simulation.
    Run,
    /// Stop ticking; the world stays as it is until `update` or `run`.
    Pause,
    /// Advance exactly one tick, then stay paused.
    Update,
    /// End the debugging session; the simulation keeps running.
    Close,
    /// Drop the link without affecting run state, for a tool that crashed or
    /// lost its connection and will reattach.
    Disconnect,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Running,
    Paused,
}

/// Tracks the paused/running state the control channel toggles, and whether
/// the current tick should run (for `update`, exactly one tick).
pub struct DebuggerSession {
    state: RunState,
    step_once: bool,
}

impl DebuggerSession {
    pub fn new() -> Self {
        Self {
            state: RunState::Paused,
            step_once: false,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Whether the schedule should run this tick, consuming a pending
    /// single-step request if there is one.
    pub fn should_tick(&mut self) -> bool {
        if self.state == RunState::Running {
            return true;
        }
        if self.step_once {
            self.step_once = false;
            return true;
        }
        false
    }

    /// Applies one command, returning `true` if the session should keep
    /// serving further commands and `false` if it just closed or
    /// disconnected.
    pub fn apply(&mut self, command: DebuggerCommand) -> bool {
        match command {
            DebuggerCommand::Run => {
                self.state = RunState::Running;
                true
            }
            DebuggerCommand::Pause => {
                self.state = RunState::Paused;
                true
            }
            DebuggerCommand::Update => {
                self.step_once = true;
                true
            }
            DebuggerCommand::Close | DebuggerCommand::Disconnect => false,
        }
    }
}

impl Default for DebuggerSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads one newline-delimited JSON command from `reader`. `Ok(None)` means
/// a clean EOF: the peer hung up without ever sending `disconnect`.
pub async fn read_command(
    reader: &mut BufReader<tokio::net::tcp::OwnedReadHalf>,
) -> Result<Option<DebuggerCommand>, NetError> {
    let mut line = String::new();
    let read = reader.read_line(&mut line).await?;
    if read == 0 {
        return Ok(None);
    }
    let command: DebuggerCommand = serde_json::from_str(line.trim())?;
    Ok(Some(command))
}

pub async fn write_state(
    writer: &mut tokio::net::tcp::OwnedWriteHalf,
    state: RunState,
) -> Result<(), NetError> {
    let payload = serde_json::to_string(&state)?;
    writer.write_all(payload.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    Ok(())
}

/// Serves one debugger connection until the peer sends `close`/`disconnect`
/// or hangs up. Each command's resulting run state is echoed back so the
/// tool can confirm it landed.
pub async fn serve(stream: TcpStream, session: &mut DebuggerSession) -> Result<(), NetError> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    loop {
        let Some(command) = read_command(&mut reader).await? else {
            tracing::info!("debugger connection closed by peer");
            return Ok(());
        };
        tracing::debug!(?command, "debugger command received");
        let keep_going = session.apply(command);
        write_state(&mut write_half, session.state()).await?;
        if !keep_going {
            return Ok(());
        }
    }
}
