// src/repl/session.rs - Session with a MicroPython interpreter over a byte channel
use super::device_info::DeviceInfo;
use super::literal::{parse_str_sequence, quote};
use super::ReplError;
use crate::config::ReplConfig;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{sleep, timeout_at, Instant};

/// Ctrl-C, interrupts whatever the interpreter is running.
const INTERRUPT: &[u8] = b"\x03";
/// Substring of the `os.uname()` output that identifies a MicroPython board.
const IDENTITY_MARKER: &str = "version";
const TRACEBACK_MARKER: &str = "Traceback (most recent call last):";
const IMPORT_STATEMENT: &str = "import os, machine";
const UNAME_STATEMENT: &str = "os.uname()";

/// A verified dialogue with the interactive interpreter on a device.
///
/// The session owns its transport exclusively. Every operation writes one or
/// more statements and waits for the prompt that follows the echo of each,
/// so output left over from an earlier statement is never taken as a reply.
pub struct ReplSession<T> {
    transport: T,
    config: ReplConfig,
    device_info: Option<DeviceInfo>,
    /// Set when an exchange ended without its prompt; pending output is
    /// drained before the next statement.
    resync: bool,
}

/// How the read of one response ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ending {
    Prompt,
    TimedOut,
    Closed,
}

/// Bytes gathered for one statement.
struct Collected {
    text: String,
    ending: Ending,
}

impl<T> ReplSession<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Identify the interpreter on `transport` and open a session with it.
    ///
    /// Sends `import os, machine` and `os.uname()`; the peer is accepted when
    /// the `uname()` output mentions `version`. A peer that answers without
    /// ever printing the prompt is rejected as an invalid device.
    pub async fn connect(transport: T, config: ReplConfig) -> Result<Self, ReplError> {
        config.validate()?;

        let mut session = Self {
            transport,
            config,
            device_info: None,
            resync: false,
        };

        // a boot banner or an idle prompt may already be waiting
        session.drain().await?;

        if session.config.interrupt_on_connect {
            tracing::debug!("Interrupting any running program");
            session.send_raw(INTERRUPT).await?;
            session.drain().await?;
        }

        session.send_line(IMPORT_STATEMENT).await?;
        session.await_handshake(IMPORT_STATEMENT).await?;

        session.send_line(UNAME_STATEMENT).await?;
        let response = session.await_handshake(UNAME_STATEMENT).await?;

        if !response.contains(IDENTITY_MARKER) {
            tracing::warn!("Device did not identify as MicroPython: {:?}", response);
            return Err(ReplError::InvalidDevice { response });
        }

        session.device_info = DeviceInfo::from_uname(&response);
        match &session.device_info {
            Some(info) => tracing::info!("Connected to {}", info),
            None => tracing::warn!("Connected, but the uname() output could not be parsed"),
        }

        Ok(session)
    }

    /// Reported firmware version, when `os.uname()` could be parsed.
    pub fn version(&self) -> Option<&str> {
        self.device_info.as_ref().map(|info| info.version.as_str())
    }

    pub fn device_info(&self) -> Option<&DeviceInfo> {
        self.device_info.as_ref()
    }

    pub fn config(&self) -> &ReplConfig {
        &self.config
    }

    /// Give the transport back to the caller, ending the session.
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Run one statement and return what it printed, without the echoed
    /// statement and the trailing prompt.
    pub async fn exec(&mut self, statement: &str) -> Result<String, ReplError> {
        self.send_line(statement).await?;
        let response = self.read_until_prompt(statement).await?;

        if let Some(message) = traceback_message(&response, &self.config.prompt) {
            tracing::warn!("Statement `{}` raised {}", statement, message);
            return Err(ReplError::Remote(message));
        }

        Ok(strip_echo(&response, statement, &self.config.prompt).to_string())
    }

    /// Reboot the device into its bootloader.
    ///
    /// The interpreter goes away without printing a prompt, so nothing is
    /// read back and the session is consumed.
    pub async fn enter_bootloader(mut self) -> Result<(), ReplError> {
        tracing::info!("Entering bootloader");
        self.send_line("machine.bootloader()").await?;
        sleep(self.config.bootloader_delay()).await;
        Ok(())
    }

    /// Write `contents` to the file `name` on the device filesystem,
    /// replacing any existing file.
    ///
    /// Contents are sent as `f.write(...)` statements of at most
    /// `write_chunk_size` characters each. The file is closed even when a
    /// write fails; the first error is returned.
    pub async fn save_file(&mut self, name: &str, contents: &str) -> Result<(), ReplError> {
        tracing::info!("Saving {} bytes to '{}'", contents.len(), name);
        self.exec(&format!("f = open({}, 'w')", quote(name))).await?;

        let written = self.write_chunks(contents).await;
        let closed = self.exec("f.close()").await;
        written?;
        closed?;

        tracing::debug!("Saved '{}'", name);
        Ok(())
    }

    /// List the entries of `directory` on the device filesystem.
    pub async fn list_files(&mut self, directory: &str) -> Result<Vec<String>, ReplError> {
        let output = self.exec(&format!("os.listdir({})", quote(directory))).await?;
        let files = parse_str_sequence(&output);
        tracing::debug!("Listed {} entries in '{}'", files.len(), directory);
        Ok(files)
    }

    async fn write_chunks(&mut self, contents: &str) -> Result<(), ReplError> {
        for chunk in char_chunks(contents, self.config.write_chunk_size) {
            self.exec(&format!("f.write({})", quote(chunk))).await?;
        }
        Ok(())
    }

    async fn send_line(&mut self, statement: &str) -> Result<(), ReplError> {
        if self.resync {
            self.drain().await?;
            self.resync = false;
        }
        tracing::debug!("REPL TX: {}", statement);
        let line = format!("{}{}", statement, self.config.line_ending);
        self.send_raw(line.as_bytes()).await
    }

    async fn send_raw(&mut self, bytes: &[u8]) -> Result<(), ReplError> {
        self.transport.write_all(bytes).await?;
        self.transport.flush().await?;
        Ok(())
    }

    /// Wait for the prompt after `statement`, failing on timeout.
    async fn read_until_prompt(&mut self, statement: &str) -> Result<String, ReplError> {
        let collected = self.collect(statement).await?;
        match collected.ending {
            Ending::Prompt => Ok(collected.text),
            Ending::TimedOut => {
                tracing::warn!("No prompt after {:?}, got {:?}", self.config.response_timeout(), collected.text);
                self.resync = true;
                Err(ReplError::Timeout(self.config.response_timeout()))
            }
            Ending::Closed => Err(ReplError::Transport(closed_error())),
        }
    }

    /// Like `read_until_prompt`, but a peer that talks without ever showing
    /// the prompt is reported as the wrong kind of device, whether it then
    /// goes quiet or hangs up.
    async fn await_handshake(&mut self, statement: &str) -> Result<String, ReplError> {
        let collected = self.collect(statement).await?;
        if collected.ending == Ending::Prompt {
            return Ok(collected.text);
        }

        let silent = collected.text.trim().is_empty();
        if !silent && !collected.text.contains(IDENTITY_MARKER) {
            tracing::warn!("Peer answered without a REPL prompt: {:?}", collected.text);
            return Err(ReplError::InvalidDevice { response: collected.text });
        }

        match collected.ending {
            Ending::Closed => Err(ReplError::Transport(closed_error())),
            _ => {
                tracing::warn!("No prompt from device within {:?}", self.config.response_timeout());
                Err(ReplError::Timeout(self.config.response_timeout()))
            }
        }
    }

    /// Accumulate reads until the echo of `statement` has arrived and the
    /// output after it ends with the prompt. Anything before the echo is
    /// left over from earlier output and is dropped.
    async fn collect(&mut self, statement: &str) -> Result<Collected, ReplError> {
        let deadline = Instant::now() + self.config.response_timeout();
        let prompt = self.config.prompt.as_bytes();
        let echo = statement.as_bytes();
        let limit = self.config.max_response_bytes;
        let mut response = Vec::with_capacity(self.config.read_chunk_size);
        let mut chunk = vec![0u8; self.config.read_chunk_size];

        loop {
            let ending = match timeout_at(deadline, self.transport.read(&mut chunk)).await {
                Err(_) => Some(Ending::TimedOut),
                Ok(Err(e)) => {
                    tracing::error!("Serial read error: {}", e);
                    return Err(ReplError::Transport(e));
                }
                Ok(Ok(0)) => Some(Ending::Closed),
                Ok(Ok(n)) => {
                    tracing::trace!("Read {} bytes from REPL", n);
                    if response.len() + n > limit {
                        self.resync = true;
                        return Err(ReplError::ResponseTooLarge { limit });
                    }
                    response.extend_from_slice(&chunk[..n]);
                    None
                }
            };

            if let Some(ending) = ending {
                return Ok(Collected {
                    text: String::from_utf8_lossy(&response).into_owned(),
                    ending,
                });
            }

            if let Some(start) = find_bytes(&response, echo) {
                if response[start + echo.len()..].ends_with(prompt) {
                    if start > 0 {
                        tracing::debug!("Dropped {} bytes of earlier output", start);
                    }
                    let text = String::from_utf8_lossy(&response[start..]).into_owned();
                    tracing::debug!("REPL RX: {:?}", text);
                    return Ok(Collected { text, ending: Ending::Prompt });
                }
            }
        }
    }

    /// Read and discard pending output until the line stays quiet for
    /// `drain_quiet_ms` or the response timeout passes.
    async fn drain(&mut self) -> Result<(), ReplError> {
        let deadline = Instant::now() + self.config.response_timeout();
        let quiet = self.config.drain_quiet();
        let mut chunk = vec![0u8; self.config.read_chunk_size];
        let mut discarded = 0;

        loop {
            let until = (Instant::now() + quiet).min(deadline);
            match timeout_at(until, self.transport.read(&mut chunk)).await {
                Ok(Ok(n)) if n > 0 => discarded += n,
                // quiet or closed; a closed channel is reported by the next read
                Ok(Ok(_)) | Err(_) => break,
                Ok(Err(e)) => return Err(ReplError::Transport(e)),
            }
            if Instant::now() >= deadline {
                break;
            }
        }

        if discarded > 0 {
            tracing::debug!("Discarded {} bytes of pending output", discarded);
        }
        Ok(())
    }
}

impl<T> std::fmt::Debug for ReplSession<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplSession")
            .field("config", &self.config)
            .field("device_info", &self.device_info)
            .finish()
    }
}

fn closed_error() -> io::Error {
    io::Error::new(
        io::ErrorKind::UnexpectedEof,
        "serial channel closed before the REPL prompt",
    )
}

/// Position of the first occurrence of `needle` in `haystack`.
fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}

/// Remove the echoed statement and the trailing prompt from a response.
fn strip_echo<'a>(response: &'a str, statement: &str, prompt: &str) -> &'a str {
    let text = response.strip_suffix(prompt).unwrap_or(response);
    let text = text.trim_start_matches(['\r', '\n']);
    let text = text.strip_prefix(statement).unwrap_or(text);
    text.trim()
}

/// Last line of a Python traceback in `response`, e.g.
/// `OSError: [Errno 2] ENOENT`.
fn traceback_message(response: &str, prompt: &str) -> Option<String> {
    let (_, trace) = response.split_once(TRACEBACK_MARKER)?;
    let trace = trace.strip_suffix(prompt).unwrap_or(trace);
    trace
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .map(str::to_string)
}

/// Split `text` into slices of at most `max_chars` characters.
fn char_chunks(text: &str, max_chars: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (idx, _) in text.char_indices() {
        if count == max_chars {
            chunks.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        chunks.push(&text[start..]);
    }
    chunks
}
