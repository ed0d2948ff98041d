//! Local execution of the chain binary.
//!
//! Every invocation is a program plus a structured argument list; nothing is
//! ever routed through a shell. Standard output and standard error share one
//! pipe so the captured text keeps the order in which the child wrote it.

use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io::{self, Read, Write};
use std::process::{Command, Stdio};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("i/o failure while running `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` {}, output:\n{output}", describe_exit(.code))]
    Exit {
        command: String,
        code: Option<i32>,
        output: String,
    },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with status {code}"),
        None => "was terminated by a signal".to_string(),
    }
}

/// A single execution request: program, arguments and, for commands that
/// prompt for a secret, the lines to type into standard input.
#[derive(Clone)]
pub struct Invocation {
    program: OsString,
    args: Vec<OsString>,
    script: Option<Vec<String>>,
}

impl Invocation {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            script: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Feed `lines` to the child's standard input, one per line, then close it.
    pub fn interactive(mut self, lines: Vec<String>) -> Self {
        self.script = Some(lines);
        self
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn argv(&self) -> &[OsString] {
        &self.args
    }

    pub fn script(&self) -> Option<&[String]> {
        self.script.as_deref()
    }

    pub fn is_interactive(&self) -> bool {
        self.script.is_some()
    }

    /// Human readable command line, used in logs and error messages only.
    pub fn command_line(&self) -> String {
        let mut line = self.program.to_string_lossy().into_owned();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

// Scripted lines carry the keyring passphrase, keep them out of debug output.
impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("script_lines", &self.script.as_ref().map(Vec::len))
            .finish()
    }
}

/// Executes invocations and returns their combined output.
pub trait CommandRunner {
    fn run(&self, invocation: &Invocation) -> Result<String, ProcessError>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, invocation: &Invocation) -> Result<String, ProcessError> {
        (**self).run(invocation)
    }
}

/// Runs invocations as child processes of the current process.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<String, ProcessError> {
        let command_line = invocation.command_line();
        let io_error = |source: io::Error| ProcessError::Io {
            command: command_line.clone(),
            source,
        };
        tracing::debug!(command = %command_line, interactive = invocation.is_interactive(), "running");

        let (mut reader, writer) = io::pipe().map_err(io_error)?;
        let writer_err = writer.try_clone().map_err(io_error)?;
        // The command owns the parent's copies of the write end; it must be
        // dropped before reading or the pipe never reaches EOF.
        let mut child = {
            let mut command = Command::new(invocation.program());
            command
                .args(invocation.argv())
                .stdout(writer)
                .stderr(writer_err)
                .stdin(if invocation.is_interactive() {
                    Stdio::piped()
                } else {
                    Stdio::null()
                });
            command.spawn().map_err(|source| ProcessError::Spawn {
                command: command_line.clone(),
                source,
            })?
        };

        if let (Some(mut stdin), Some(lines)) = (child.stdin.take(), invocation.script()) {
            match write_script(&mut stdin, lines) {
                // The child may exit without reading its input; its status and
                // output are the interesting part then.
                Err(err) if err.kind() != io::ErrorKind::BrokenPipe => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(io_error(err));
                }
                _ => {}
            }
        }

        let mut captured = Vec::new();
        reader.read_to_end(&mut captured).map_err(io_error)?;
        let status = child.wait().map_err(io_error)?;
        let output = String::from_utf8_lossy(&captured).into_owned();
        tracing::trace!(command = %command_line, output = %loggable(invocation, &output), "finished");

        if status.success() {
            Ok(output)
        } else {
            Err(ProcessError::Exit {
                command: command_line,
                code: status.code(),
                output,
            })
        }
    }
}

/// Output of commands that were fed a secret can contain key material
/// (`keys add` prints the mnemonic), so only its size is logged.
fn loggable<'a>(invocation: &Invocation, output: &'a str) -> Cow<'a, str> {
    if invocation.is_interactive() {
        Cow::Owned(format!("<{} bytes withheld>", output.len()))
    } else {
        Cow::Borrowed(output)
    }
}

fn write_script(stdin: &mut impl Write, lines: &[String]) -> io::Result<()> {
    for line in lines {
        stdin.write_all(line.as_bytes())?;
        stdin.write_all(b"\n")?;
    }
    stdin.flush()
}
