//! External SAR engine execution
//!
//! The radar processing itself (orbit correction, calibration, deburst,
//! speckle filtering, terrain correction, subsetting) is done by the engine's
//! graph processing tool. This module only hands it a graph and checks the
//! outcome.

use crate::core::graph::ProcessingGraph;
use crate::types::{SarError, SarResult};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Environment variable pointing at the graph processing executable
pub const GPT_ENV: &str = "SNAP_GPT";

/// Something that can run a processing graph
pub trait ProcessingEngine {
    fn name(&self) -> &str;

    fn execute(&self, graph: &ProcessingGraph) -> SarResult<()>;
}

/// Engine settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Explicit path to `gpt`; otherwise `SNAP_GPT`, `PATH` and the default install dirs are searched
    pub gpt_path: Option<PathBuf>,
    /// Maximum parallelism passed as `-q`
    pub threads: Option<usize>,
    /// Tile cache size passed as `-c`, e.g. `4G`
    pub cache_size: Option<String>,
    /// Keep a copy of the executed graph here
    pub save_graph: Option<PathBuf>,
}

/// Runs graphs through the engine's `gpt` command line tool
#[derive(Debug, Clone)]
pub struct GptEngine {
    executable: PathBuf,
    config: EngineConfig,
}

impl GptEngine {
    /// Locate `gpt` according to the configuration
    pub fn new(config: EngineConfig) -> SarResult<Self> {
        let executable = locate_gpt(config.gpt_path.as_deref())?;
        log::info!("Using engine executable {}", executable.display());
        Ok(Self { executable, config })
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Command line arguments for a graph file
    pub fn arguments(&self, graph_file: &Path) -> Vec<String> {
        let mut args = vec![graph_file.to_string_lossy().into_owned()];
        if let Some(threads) = self.config.threads {
            args.push("-q".to_string());
            args.push(threads.to_string());
        }
        if let Some(cache) = &self.config.cache_size {
            args.push("-c".to_string());
            args.push(cache.clone());
        }
        args
    }
}

impl ProcessingEngine for GptEngine {
    fn name(&self) -> &str {
        "gpt"
    }

    fn execute(&self, graph: &ProcessingGraph) -> SarResult<()> {
        let xml = graph.to_xml()?;

        let mut graph_file = tempfile::Builder::new()
            .prefix("radar-cs-graph-")
            .suffix(".xml")
            .tempfile()?;
        graph_file.write_all(xml.as_bytes())?;
        graph_file.flush()?;

        if let Some(copy) = &self.config.save_graph {
            if let Some(parent) = copy.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(copy, &xml)?;
            log::info!("Saved processing graph to {}", copy.display());
        }

        log::info!(
            "Running {} on {} ({})",
            self.executable.display(),
            graph.input().display(),
            graph.operator_names().join(" -> ")
        );
        let start = std::time::Instant::now();

        let mut child = Command::new(&self.executable)
            .args(self.arguments(graph_file.path()))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                SarError::Engine(format!(
                    "Failed to start {}: {}",
                    self.executable.display(),
                    e
                ))
            })?;

        // Drain stderr on its own thread so neither pipe can fill up and block
        let stderr = child.stderr.take();
        let stderr_lines = std::thread::spawn(move || {
            let mut tail = Vec::new();
            if let Some(stderr) = stderr {
                for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                    log::warn!("[gpt] {}", line);
                    tail.push(line);
                    if tail.len() > 20 {
                        tail.remove(0);
                    }
                }
            }
            tail
        });

        if let Some(stdout) = child.stdout.take() {
            for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                log::debug!("[gpt] {}", line);
            }
        }

        let status = child.wait()?;
        let tail = stderr_lines.join().unwrap_or_default();

        if !status.success() {
            return Err(SarError::Engine(format!(
                "{} exited with {}{}",
                self.executable.display(),
                status,
                if tail.is_empty() {
                    String::new()
                } else {
                    format!(": {}", tail.join("\n"))
                }
            )));
        }

        for target in graph.writes() {
            if !target.path.exists() {
                return Err(SarError::Engine(format!(
                    "Engine finished but {} was not written",
                    target.path.display()
                )));
            }
        }

        log::info!("Engine finished in {:?}", start.elapsed());
        Ok(())
    }
}

/// Writes the graph document to a file instead of running it
#[derive(Debug, Clone)]
pub struct DryRunEngine {
    output: PathBuf,
}

impl DryRunEngine {
    pub fn new<P: AsRef<Path>>(output: P) -> Self {
        Self {
            output: output.as_ref().to_path_buf(),
        }
    }
}

impl ProcessingEngine for DryRunEngine {
    fn name(&self) -> &str {
        "dry-run"
    }

    fn execute(&self, graph: &ProcessingGraph) -> SarResult<()> {
        let xml = graph.to_xml()?;
        if let Some(parent) = self.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.output, xml)?;
        log::info!("Dry run: graph written to {}", self.output.display());
        Ok(())
    }
}

/// Find the `gpt` executable
pub fn locate_gpt(explicit: Option<&Path>) -> SarResult<PathBuf> {
    if let Some(path) = explicit {
        return if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            Err(SarError::Engine(format!(
                "Configured gpt path {} does not exist",
                path.display()
            )))
        };
    }

    if let Some(path) = std::env::var_os(GPT_ENV).map(PathBuf::from) {
        if path.is_file() {
            return Ok(path);
        }
        log::warn!("{} points at missing file {}", GPT_ENV, path.display());
    }

    let candidates = search_path_candidates().chain(install_dir_candidates());
    for candidate in candidates {
        if candidate.is_file() {
            return Ok(candidate);
        }
    }

    Err(SarError::Engine(format!(
        "Could not find the gpt executable; set {} or engine.gptPath",
        GPT_ENV
    )))
}

fn search_path_candidates() -> impl Iterator<Item = PathBuf> {
    let paths = std::env::var_os("PATH").unwrap_or_default();
    std::env::split_paths(&paths)
        .map(|dir| dir.join(gpt_file_name()))
        .collect::<Vec<_>>()
        .into_iter()
}

fn install_dir_candidates() -> impl Iterator<Item = PathBuf> {
    let home = dirs::home_dir();
    ["esa-snap", "snap"]
        .into_iter()
        .filter_map(move |dir| home.as_ref().map(|h| h.join(dir).join("bin").join(gpt_file_name())))
        .collect::<Vec<_>>()
        .into_iter()
}

fn gpt_file_name() -> &'static str {
    if cfg!(windows) {
        "gpt.exe"
    } else {
        "gpt"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_missing_gpt_is_an_error() {
        let result = locate_gpt(Some(Path::new("/definitely/not/here/gpt")));
        assert!(matches!(result, Err(SarError::Engine(_))));
    }

    #[test]
    fn test_arguments_include_tuning_flags() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("gpt");
        std::fs::write(&fake, "").unwrap();

        let engine = GptEngine::new(EngineConfig {
            gpt_path: Some(fake),
            threads: Some(4),
            cache_size: Some("2G".to_string()),
            save_graph: None,
        })
        .unwrap();

        let args = engine.arguments(Path::new("graph.xml"));
        assert_eq!(args, vec!["graph.xml", "-q", "4", "-c", "2G"]);
    }
}
