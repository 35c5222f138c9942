use std::{
    io::{Read, Write},
    process::{Child, Command, Stdio},
    sync::mpsc::{self, RecvTimeoutError},
    thread,
    time::{Duration, Instant},
};

use crate::{error::ExtractError, geofile::geojson::FeatureCollection};

use super::simplifier::GeometrySimplifier;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Runs `geo2topo` (or a compatible command) on the GeoJSON collection and returns the
/// TopoJSON it prints.
#[derive(Debug, Clone)]
pub struct Geo2TopoSimplifier {
    /// Program followed by leading arguments, e.g. `["npx", "geo2topo"]`.
    pub command: Vec<String>,
    /// Name of the object in the resulting topology.
    pub object_name: String,
    pub timeout: Duration,
}

impl Default for Geo2TopoSimplifier {
    fn default() -> Self {
        Self {
            command: vec!["geo2topo".to_string()],
            object_name: "geometry".to_string(),
            timeout: Duration::from_secs(300),
        }
    }
}

impl Geo2TopoSimplifier {
    fn command_name(&self) -> String {
        self.command.join(" ")
    }

    /// Arguments after the command: quantize, read the object from stdin, write to stdout.
    pub fn arguments(&self, quantization: f64) -> Vec<String> {
        vec![
            "-q".to_string(),
            quantization.to_string(),
            format!("{}=-", self.object_name),
            "-o".to_string(),
            "-".to_string(),
        ]
    }
}

#[derive(Debug, Clone, Copy)]
enum OutputStream {
    Stdout,
    Stderr,
}

fn read_all(mut reader: impl Read) -> Vec<u8> {
    let mut buffer = Vec::new();
    if let Err(err) = reader.read_to_end(&mut buffer) {
        log::debug!("Could not read subprocess output, {}", err);
    }
    buffer
}

/// Kills the child and everything it started. The child leads its own process group, so
/// background jobs holding its pipes go down with it.
fn kill_process_group(child: &mut Child) {
    #[cfg(unix)]
    {
        let group = -(child.id() as libc::pid_t);
        // SAFETY: plain syscall on a pid we own; failure only means the group is already gone.
        if unsafe { libc::kill(group, libc::SIGKILL) } != 0 {
            log::debug!(
                "Could not kill process group {}, {}",
                child.id(),
                std::io::Error::last_os_error()
            );
        }
    }
    if let Err(err) = child.kill() {
        log::debug!("Could not kill subprocess {}, {}", child.id(), err);
    }
    if let Err(err) = child.wait() {
        log::debug!("Could not reap subprocess {}, {}", child.id(), err);
    }
}

impl GeometrySimplifier for Geo2TopoSimplifier {
    fn simplify(
        &self,
        collection: &FeatureCollection,
        quantization: f64,
    ) -> Result<Vec<u8>, ExtractError> {
        let command_name = self.command_name();
        let (program, leading_args) =
            self.command
                .split_first()
                .ok_or_else(|| ExtractError::ExternalToolSpawn {
                    command: command_name.clone(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "empty simplifier command",
                    ),
                })?;
        let arguments = self.arguments(quantization);
        log::debug!("Running {} {}", command_name, arguments.join(" "));

        let mut command = Command::new(program);
        command
            .args(leading_args)
            .args(&arguments)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        let mut child = command
            .spawn()
            .map_err(|source| ExtractError::ExternalToolSpawn {
                command: command_name.clone(),
                source,
            })?;

        // Feed stdin and drain stdout/stderr on their own threads so that neither side blocks
        // on a full pipe. None of them is joined: a descendant may keep a pipe open past the
        // child's exit, so outputs arrive over a channel bounded by the same deadline.
        let input = collection.to_geojson_string().into_bytes();
        let mut stdin = child.stdin.take().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "subprocess stdin unavailable")
        })?;
        thread::spawn(move || {
            if let Err(err) = stdin.write_all(&input) {
                // The tool may exit before consuming all of its input.
                log::debug!("Could not write all input to subprocess, {}", err);
            }
        });
        let (sender, receiver) = mpsc::channel();
        let mut pending = 0;
        if let Some(stdout) = child.stdout.take() {
            let sender = sender.clone();
            thread::spawn(move || sender.send((OutputStream::Stdout, read_all(stdout))));
            pending += 1;
        }
        if let Some(stderr) = child.stderr.take() {
            let sender = sender.clone();
            thread::spawn(move || sender.send((OutputStream::Stderr, read_all(stderr))));
            pending += 1;
        }
        drop(sender);

        let deadline = Instant::now() + self.timeout;
        let timed_out = |child: &mut Child| {
            log::warn!("Killing {} after {:?}", command_name, self.timeout);
            kill_process_group(child);
            ExtractError::ExternalToolTimeout {
                command: command_name.clone(),
                timeout: self.timeout,
            }
        };

        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                return Err(timed_out(&mut child));
            }
            thread::sleep(POLL_INTERVAL);
        };

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        while pending > 0 {
            match receiver.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                Ok((OutputStream::Stdout, bytes)) => stdout = bytes,
                Ok((OutputStream::Stderr, bytes)) => stderr = bytes,
                Err(RecvTimeoutError::Timeout) => return Err(timed_out(&mut child)),
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::BrokenPipe,
                        "subprocess output reader stopped",
                    )
                    .into())
                }
            }
            pending -= 1;
        }

        if !status.success() {
            return Err(ExtractError::ExternalTool {
                command: command_name,
                code: status.code(),
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }
        Ok(stdout)
    }
}
