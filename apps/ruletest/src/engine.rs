//! Analyzer invocation, either as a local process or inside a container.
//!
//! The analyzer itself is opaque: it gets a provider settings file, a rules
//! directory and an output path, and either exits zero or not. Its stdout
//! goes to the group log; stderr becomes the error text on failure. Every
//! invocation also yields a shell-ready reproducer line.

use crate::error::EngineError;
use crate::settings::{reroot, CONTAINER_DATA_DIR, CONTAINER_SHARED_DIR};
use crate::utils::shell_quote;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Default)]
/// One analyzer run. All paths are host paths.
pub struct EngineRequest {
    pub settings: PathBuf,
    pub rules: PathBuf,
    pub output: PathBuf,
    pub group_dir: PathBuf,
    pub verbosity: u32,
    pub dep_label_selector: String,
    pub volumes: Vec<(PathBuf, PathBuf)>,
}

#[derive(Debug)]
pub struct EngineRun {
    pub reproducer: String,
    pub outcome: Result<(), EngineError>,
}

pub trait Engine {
    /// Full argv, program first.
    fn command(&self, req: &EngineRequest) -> Vec<String>;

    fn timeout(&self) -> Option<Duration>;

    /// Run the analyzer and block until it exits (or times out).
    fn invoke(&self, req: &EngineRequest, log: &File) -> EngineRun {
        let argv = self.command(req);
        let reproducer = reproducer_line(&argv);
        debug!(command = %reproducer, "invoking analyzer");
        let outcome = run_command(&argv, log, self.timeout());
        EngineRun {
            reproducer,
            outcome,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocalEngine {
    pub binary: String,
    pub timeout: Option<Duration>,
}

impl Engine for LocalEngine {
    fn command(&self, req: &EngineRequest) -> Vec<String> {
        let mut argv = vec![self.binary.clone()];
        argv.extend(analyzer_args(
            &req.settings,
            &req.rules,
            &req.output,
            req.verbosity,
            &req.dep_label_selector,
        ));
        argv
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

#[derive(Debug, Clone)]
pub struct ContainerEngine {
    /// `podman` or `docker`.
    pub tool: String,
    pub image: String,
    /// Analyzer entrypoint inside the image.
    pub binary: String,
    pub timeout: Option<Duration>,
}

impl ContainerEngine {
    /// Path of a host file as mounted in the container.
    fn in_container(&self, req: &EngineRequest, host: &Path) -> PathBuf {
        match host.strip_prefix(&req.group_dir) {
            Ok(rel) => Path::new(CONTAINER_SHARED_DIR).join(rel),
            Err(_) => reroot(Path::new(CONTAINER_DATA_DIR), host),
        }
    }
}

impl Engine for ContainerEngine {
    fn command(&self, req: &EngineRequest) -> Vec<String> {
        let mut argv = vec![
            self.tool.clone(),
            "run".to_string(),
            "--rm".to_string(),
            "--entrypoint".to_string(),
            self.binary.clone(),
        ];
        for (host, target) in &req.volumes {
            argv.push("-v".to_string());
            argv.push(format!("{}:{}:Z", host.display(), target.display()));
        }
        argv.push("-v".to_string());
        argv.push(format!(
            "{}:{}:Z",
            req.group_dir.display(),
            CONTAINER_SHARED_DIR
        ));
        argv.push(self.image.clone());
        argv.extend(analyzer_args(
            &self.in_container(req, &req.settings),
            &self.in_container(req, &req.rules),
            &self.in_container(req, &req.output),
            req.verbosity,
            &req.dep_label_selector,
        ));
        argv
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

fn analyzer_args(
    settings: &Path,
    rules: &Path,
    output: &Path,
    verbosity: u32,
    dep_label_selector: &str,
) -> Vec<String> {
    let mut args = vec![
        format!("--provider-settings={}", settings.display()),
        format!("--rules={}", rules.display()),
        format!("--output-file={}", output.display()),
        format!("--verbose={}", verbosity),
    ];
    if !dep_label_selector.is_empty() {
        args.push(format!("--dep-label-selector={}", dep_label_selector));
    }
    args
}

pub fn reproducer_line(argv: &[String]) -> String {
    argv.iter()
        .map(|a| shell_quote(a))
        .collect::<Vec<_>>()
        .join(" ")
}

fn run_command(argv: &[String], log: &File, timeout: Option<Duration>) -> Result<(), EngineError> {
    let Some((program, args)) = argv.split_first() else {
        return Err(EngineError::Spawn(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "empty command",
        )));
    };
    let stdout = log.try_clone().map_err(EngineError::Spawn)?;
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::piped())
        .spawn()
        .map_err(EngineError::Spawn)?;

    // drain stderr concurrently so a chatty analyzer cannot block on a full pipe
    let stderr = child.stderr.take();
    let reader = std::thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut s) = stderr {
            let _ = s.read_to_string(&mut buf);
        }
        buf
    });

    let status = match timeout {
        None => child.wait().map_err(EngineError::Wait)?,
        Some(limit) => {
            let deadline = Instant::now() + limit;
            loop {
                if let Some(status) = child.try_wait().map_err(EngineError::Wait)? {
                    break status;
                }
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    let _ = reader.join();
                    return Err(EngineError::TimedOut(limit.as_secs()));
                }
                std::thread::sleep(POLL_INTERVAL);
            }
        }
    };
    let stderr = reader.join().unwrap_or_default();
    if status.success() {
        Ok(())
    } else {
        Err(EngineError::Failed {
            status: status.to_string(),
            stderr: stderr.trim().to_string(),
        })
    }
}
