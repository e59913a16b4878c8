// Shared helpers for scripting a MicroPython REPL on a mock transport
#![allow(dead_code)]

use mpy_repl::config::ReplConfig;
use std::collections::HashMap;
use std::time::Duration;
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::time::sleep;
use tokio_test::io::Builder;

pub const UNAME: &str = "(sysname='rp2', nodename='rp2', release='1.22.0', \
version='v1.22.0 on 2023-12-27 (GNU 13.2.0 MinSizeRel)', machine='Raspberry Pi Pico W with RP2040')";

pub fn test_config() -> ReplConfig {
    ReplConfig {
        response_timeout_ms: 200,
        bootloader_delay_ms: 1,
        interrupt_on_connect: false,
        drain_quiet_ms: 10,
        ..ReplConfig::default()
    }
}

/// Expect `source` on the wire and answer with its echo, `output` and
/// the prompt, the way the interpreter does.
pub fn statement<'a>(builder: &'a mut Builder, source: &str, output: &str) -> &'a mut Builder {
    let line = format!("{}\r\n", source);
    let mut reply = line.clone();
    if !output.is_empty() {
        reply.push_str(output);
        reply.push_str("\r\n");
    }
    reply.push_str(">>> ");
    builder.write(line.as_bytes()).read(reply.as_bytes())
}

/// Script the identification exchange performed by `ReplSession::connect`.
pub fn handshake(builder: &mut Builder) -> &mut Builder {
    statement(builder, "import os, machine", "");
    statement(builder, "os.uname()", UNAME)
}

/// An interpreter running in a background task on one end of an in-memory
/// pipe. Unlike the `Builder` scripts it keeps its own timing, so replies
/// can arrive late or before the host asks for them.
pub struct SimulatedBoard {
    pending: String,
    interrupt_delay: Duration,
    replies: HashMap<String, (String, Duration)>,
}

impl SimulatedBoard {
    pub fn new() -> Self {
        let mut replies = HashMap::new();
        replies.insert("os.uname()".to_string(), (UNAME.to_string(), Duration::ZERO));
        Self {
            pending: String::new(),
            interrupt_delay: Duration::ZERO,
            replies,
        }
    }

    /// Output already buffered when the host opens the port.
    pub fn pending_output(mut self, text: &str) -> Self {
        self.pending = text.to_string();
        self
    }

    /// Pause before the prompt that answers Ctrl-C.
    pub fn interrupt_delay(mut self, delay: Duration) -> Self {
        self.interrupt_delay = delay;
        self
    }

    /// Print `output` `delay` after `statement` is echoed. Statements
    /// without a reply print nothing.
    pub fn reply(mut self, statement: &str, output: &str, delay: Duration) -> Self {
        self.replies
            .insert(statement.to_string(), (output.to_string(), delay));
        self
    }

    /// Start the board and return the host end of the pipe.
    pub fn spawn(self) -> DuplexStream {
        let (host, mut board) = duplex(4096);
        tokio::spawn(async move {
            if board.write_all(self.pending.as_bytes()).await.is_err() {
                return;
            }
            let mut line = Vec::new();
            let mut byte = [0u8; 1];
            loop {
                match board.read(&mut byte).await {
                    Ok(0) | Err(_) => return,
                    Ok(_) => {}
                }
                let reply = match byte[0] {
                    0x03 => {
                        sleep(self.interrupt_delay).await;
                        "\r\n>>> ".to_string()
                    }
                    b'\n' => {
                        let text = String::from_utf8_lossy(&line).trim_end_matches('\r').to_string();
                        line.clear();
                        if board.write_all(format!("{}\r\n", text).as_bytes()).await.is_err() {
                            return;
                        }
                        let (output, delay) = self.replies.get(&text).cloned().unwrap_or_default();
                        sleep(delay).await;
                        if output.is_empty() {
                            ">>> ".to_string()
                        } else {
                            format!("{}\r\n>>> ", output)
                        }
                    }
                    b => {
                        line.push(b);
                        continue;
                    }
                };
                if board.write_all(reply.as_bytes()).await.is_err() {
                    return;
                }
            }
        });
        host
    }
}
