//! Node discovery through `mmlsnode`.
//!
//! Output looks like:
//!
//! ```text
//! GPFS nodeset    Node list
//! -------------   -------------------------------------------------------
//!    gpfs1        node10 node2 node1
//! ```

use std::path::PathBuf;

use tracing::{debug, info};

use super::SourceError;
use super::mmpmon::{command_from_argv, host_argv};

/// Default install location of `mmlsnode`.
pub const DEFAULT_MMLSNODE: &str = "/usr/lpp/mmfs/bin/mmlsnode";

const HEADER_LINES: usize = 2;

/// Extracts the sorted node list of `nodeset` (or of the first nodeset).
pub fn parse_mmlsnode(output: &str, nodeset: Option<&str>) -> Result<Vec<String>, SourceError> {
    for line in output.lines().skip(HEADER_LINES) {
        let mut tokens = line.split_whitespace();
        let Some(name) = tokens.next() else {
            continue;
        };
        if nodeset.is_some_and(|wanted| wanted != name) {
            continue;
        }
        let mut nodes: Vec<String> = tokens.map(str::to_string).collect();
        if nodes.is_empty() {
            return Err(SourceError::Discovery(format!(
                "nodeset {name} has no nodes per mmlsnode"
            )));
        }
        nodes.sort();
        debug!(nodeset = name, count = nodes.len(), "nodeset found");
        return Ok(nodes);
    }
    Err(SourceError::Discovery(match nodeset {
        Some(name) => format!("{name} is not a valid nodeset per mmlsnode"),
        None => "no nodeset could be found using mmlsnode".to_string(),
    }))
}

/// Runs `mmlsnode` on a host to learn which nodes to monitor.
#[derive(Debug, Clone)]
pub struct NodeDiscovery {
    pub program: PathBuf,
    pub host: String,
    pub nodeset: Option<String>,
}

impl NodeDiscovery {
    pub fn new(host: impl Into<String>, nodeset: Option<String>) -> Self {
        Self {
            program: PathBuf::from(DEFAULT_MMLSNODE),
            host: host.into(),
            nodeset,
        }
    }

    pub fn argv(&self) -> Vec<String> {
        host_argv(&self.host, vec![self.program.display().to_string()])
    }

    pub fn discover(&self) -> Result<Vec<String>, SourceError> {
        let argv = self.argv();
        debug!(argv = ?argv, "running mmlsnode");
        let output = command_from_argv(&argv)
            .output()
            .map_err(|source| SourceError::Spawn {
                program: argv[0].clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(SourceError::CommandFailed {
                program: argv.join(" "),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let nodes = parse_mmlsnode(&stdout, self.nodeset.as_deref())?;
        info!(host = %self.host, count = nodes.len(), "discovered nodes");
        Ok(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUTPUT: &str = "GPFS nodeset    Node list\n\
        -------------   -------------------------------------------------------\n\
        \x20  gpfs1        node10 node2 node1\n\
        \x20  backup       b1 b2\n";

    #[test]
    fn test_first_nodeset_sorted() {
        let nodes = parse_mmlsnode(OUTPUT, None).unwrap();
        assert_eq!(nodes, ["node1", "node10", "node2"]);
    }

    #[test]
    fn test_named_nodeset() {
        assert_eq!(parse_mmlsnode(OUTPUT, Some("backup")).unwrap(), ["b1", "b2"]);
    }

    #[test]
    fn test_unknown_nodeset() {
        let err = parse_mmlsnode(OUTPUT, Some("nope")).unwrap_err();
        assert_eq!(err.to_string(), "nope is not a valid nodeset per mmlsnode");
    }

    #[test]
    fn test_headers_only() {
        let err = parse_mmlsnode("GPFS nodeset    Node list\n----\n", None).unwrap_err();
        assert!(matches!(err, SourceError::Discovery(_)));
    }

    #[test]
    fn test_remote_argv() {
        let d = NodeDiscovery::new("mgr", None);
        assert_eq!(d.argv().last().map(String::as_str), Some(DEFAULT_MMLSNODE));
        assert_eq!(d.argv()[0], "ssh");
        assert_eq!(NodeDiscovery::new("localhost", None).argv(), [DEFAULT_MMLSNODE]);
    }
}
