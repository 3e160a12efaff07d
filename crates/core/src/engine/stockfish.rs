//! Stockfish chess engine interface
//!
//! Spawns Stockfish as a subprocess and communicates via UCI protocol.

use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, warn};

use super::analysis::{Evaluation, PositionAnalysis};

/// Error type for engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    /// Failed to start the engine process
    #[error("Failed to start engine: {0}")]
    Spawn(String),
    /// Failed to communicate with engine
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Engine returned unexpected response
    #[error("Protocol error: {0}")]
    Protocol(String),
    /// Engine not started
    #[error("Engine not started")]
    NotInitialized,
}

/// How a search is bounded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchLimit {
    Depth(u8),
    MoveTime(Duration),
}

impl SearchLimit {
    fn go_command(&self) -> String {
        match self {
            SearchLimit::Depth(depth) => format!("go depth {}", depth),
            SearchLimit::MoveTime(time) => format!("go movetime {}", time.as_millis()),
        }
    }
}

/// Playing strength configured through `UCI_LimitStrength`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strength {
    Full,
    Limited(u16),
}

/// Wrapper around a Stockfish process
///
/// Every exchange marks itself in flight until its reply is fully read.
/// A future dropped mid-exchange leaves the flag set, and the next exchange
/// first drains the stale output so replies never shift by one.
pub struct StockfishEngine {
    /// The child process, killed on drop
    process: Child,
    /// Stdin for sending commands
    stdin: ChildStdin,
    /// Stdout reader for receiving responses
    stdout: BufReader<ChildStdout>,
    in_flight: bool,
    /// `None` while a strength change is unconfirmed
    strength: Option<Strength>,
    /// Set once the process stops answering
    closed: bool,
}

impl StockfishEngine {
    /// Spawns the engine and completes the UCI handshake
    ///
    /// # Arguments
    /// * `path` - Path to stockfish binary (or "stockfish" if in PATH)
    pub async fn new(path: &str) -> Result<Self, EngineError> {
        let mut process = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::Spawn(format!("{}: {}", path, e)))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| EngineError::Spawn("Failed to open stdin".into()))?;

        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| EngineError::Spawn("Failed to open stdout".into()))?;

        let mut engine = StockfishEngine {
            process,
            stdin,
            stdout: BufReader::new(stdout),
            in_flight: false,
            strength: Some(Strength::Full),
            closed: false,
        };

        engine.send("uci").await?;
        engine.read_until("uciok").await?;
        engine.is_ready().await?;

        Ok(engine)
    }

    /// True once the process has exited or a pipe broke
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Sends a command to the engine
    async fn send(&mut self, cmd: &str) -> Result<(), EngineError> {
        debug!(cmd, "uci <");
        let written = match self.stdin.write_all(format!("{}\n", cmd).as_bytes()).await {
            Ok(()) => self.stdin.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            self.closed = true;
            return Err(e.into());
        }
        Ok(())
    }

    /// Reads a line from the engine
    async fn read_line(&mut self) -> Result<String, EngineError> {
        let mut line = String::new();
        let read = match self.stdout.read_line(&mut line).await {
            Ok(read) => read,
            Err(e) => {
                self.closed = true;
                return Err(e.into());
            }
        };
        if read == 0 {
            self.closed = true;
            return Err(EngineError::Protocol("engine closed its output".into()));
        }
        Ok(line.trim().to_string())
    }

    /// Reads lines until we get the expected response
    async fn read_until(&mut self, expected: &str) -> Result<Vec<String>, EngineError> {
        let mut lines = Vec::new();
        loop {
            let line = self.read_line().await?;
            let done = line.starts_with(expected);
            lines.push(line);
            if done {
                break;
            }
        }
        Ok(lines)
    }

    async fn is_ready(&mut self) -> Result<(), EngineError> {
        self.send("isready").await?;
        self.read_until("readyok").await?;
        Ok(())
    }

    /// Starts an exchange, draining whatever an interrupted one left behind
    async fn begin(&mut self) -> Result<(), EngineError> {
        if self.in_flight {
            warn!("discarding output of an interrupted engine command");
            // The empty line terminates a half-written command
            self.send("").await?;
            self.send("stop").await?;
            self.is_ready().await?;
        }
        self.in_flight = true;
        Ok(())
    }

    pub async fn set_option(&mut self, name: &str, value: &str) -> Result<(), EngineError> {
        self.begin().await?;
        self.send(&format!("setoption name {} value {}", name, value)).await?;
        self.is_ready().await?;
        self.in_flight = false;
        Ok(())
    }

    /// Switches between full and limited strength; a no-op when the
    /// engine is already configured that way
    pub async fn set_strength(&mut self, strength: Strength) -> Result<(), EngineError> {
        if self.strength == Some(strength) {
            return Ok(());
        }
        self.strength = None;
        match strength {
            Strength::Full => self.set_option("UCI_LimitStrength", "false").await?,
            Strength::Limited(elo) => {
                self.set_option("UCI_LimitStrength", "true").await?;
                self.set_option("UCI_Elo", &elo.to_string()).await?;
            }
        }
        self.strength = Some(strength);
        Ok(())
    }

    /// Sets a position from a FEN string
    ///
    /// # Arguments
    /// * `fen` - FEN string, or None for starting position
    /// * `moves` - Optional list of UCI moves to play from the position
    pub async fn set_position(
        &mut self,
        fen: Option<&str>,
        moves: Option<&[String]>,
    ) -> Result<(), EngineError> {
        let pos_str = match fen {
            Some(f) => format!("position fen {}", f),
            None => "position startpos".to_string(),
        };

        let cmd = match moves {
            Some(m) if !m.is_empty() => format!("{} moves {}", pos_str, m.join(" ")),
            _ => pos_str,
        };

        self.begin().await?;
        self.send(&cmd).await?;
        self.in_flight = false;
        Ok(())
    }

    /// Searches the current position until the engine reports `bestmove`
    pub async fn search(&mut self, limit: SearchLimit) -> Result<PositionAnalysis, EngineError> {
        self.begin().await?;
        self.send(&limit.go_command()).await?;

        let mut info = InfoState::default();
        loop {
            let line = self.read_line().await?;

            if line.starts_with("bestmove") {
                info.best_move = parse_bestmove(&line);
                break;
            } else if line.starts_with("info") {
                parse_info_line(&line, &mut info);
            }
        }

        self.in_flight = false;
        Ok(info.into_analysis())
    }

    /// Analyzes the current position to a fixed depth
    pub async fn analyze(&mut self, depth: u8) -> Result<PositionAnalysis, EngineError> {
        self.search(SearchLimit::Depth(depth)).await
    }

    /// Quit the engine cleanly
    pub async fn quit(&mut self) -> Result<(), EngineError> {
        self.send("quit").await?;
        if tokio::time::timeout(Duration::from_millis(500), self.process.wait())
            .await
            .is_err()
        {
            self.process.kill().await?;
        }
        Ok(())
    }
}

/// Values collected from `info` lines during one search
#[derive(Debug, Default)]
struct InfoState {
    best_move: String,
    evaluation: Option<Evaluation>,
    pv: Vec<String>,
    depth: u8,
    time_ms: u64,
    nodes: u64,
}

impl InfoState {
    fn into_analysis(self) -> PositionAnalysis {
        PositionAnalysis {
            best_move: self.best_move,
            evaluation: self.evaluation.unwrap_or(Evaluation::Centipawns(0)),
            depth: self.depth,
            pv: self.pv,
            time_ms: self.time_ms,
            nodes: self.nodes,
        }
    }
}

/// Parses "bestmove e2e4 ponder e7e5"; "(none)" becomes empty
fn parse_bestmove(line: &str) -> String {
    match line.split_whitespace().nth(1) {
        Some("(none)") | None => String::new(),
        Some(mv) => mv.to_string(),
    }
}

/// Parses an info line from Stockfish
fn parse_info_line(line: &str, info: &mut InfoState) {
    let parts: Vec<&str> = line.split_whitespace().collect();
    // Secondary lines of a multi-PV search would overwrite the main line
    if let Some(i) = parts.iter().position(|p| *p == "multipv") {
        if parts.get(i + 1).is_some_and(|n| *n != "1") {
            return;
        }
    }

    let mut i = 0;
    while i < parts.len() {
        match parts[i] {
            "depth" => {
                if let Some(depth) = parts.get(i + 1).and_then(|d| d.parse().ok()) {
                    info.depth = depth;
                }
                i += 2;
            }
            "score" => {
                if i + 2 < parts.len() {
                    match parts[i + 1] {
                        "cp" => {
                            if let Ok(cp) = parts[i + 2].parse::<i32>() {
                                info.evaluation = Some(Evaluation::Centipawns(cp));
                            }
                        }
                        "mate" => {
                            if let Ok(m) = parts[i + 2].parse::<i32>() {
                                info.evaluation = Some(Evaluation::Mate(m));
                            }
                        }
                        _ => {}
                    }
                }
                i += 3;
            }
            "time" => {
                if let Some(time) = parts.get(i + 1).and_then(|t| t.parse().ok()) {
                    info.time_ms = time;
                }
                i += 2;
            }
            "nodes" => {
                if let Some(nodes) = parts.get(i + 1).and_then(|n| n.parse().ok()) {
                    info.nodes = nodes;
                }
                i += 2;
            }
            "pv" => {
                // Everything after "pv" is the principal variation
                info.pv = parts[i + 1..].iter().map(|s| s.to_string()).collect();
                break;
            }
            _ => {
                i += 1;
            }
        }
    }
}
