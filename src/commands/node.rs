use std::sync::Arc;

use failure::ResultExt;
use slog::Logger;

use super::super::node::NodeStat;
use super::super::watch::LoggingWatcher;
use super::super::ErrorKind;
use super::super::Nodes;
use super::super::Result;

pub fn exists(nodes: &Nodes, path: &str, watch: bool) -> Result<()> {
    match nodes.exists(path, watch)? {
        Some(stat) => print_stat(&stat),
        None => {
            println!("Node {} does not exist", path);
            Ok(())
        }
    }
}

pub fn create(nodes: &Nodes, path: &str, data: &str) -> Result<()> {
    nodes.create_node(path, data)?;
    println!("Created {}", path);
    Ok(())
}

pub fn update(nodes: &Nodes, path: &str, data: &str, version: Option<i32>) -> Result<()> {
    let stat = match version {
        Some(version) => nodes.update_node_versioned(path, data, version)?,
        None => nodes.update_node(path, data)?,
    };
    print_stat(&stat)
}

pub fn delete(nodes: &Nodes, path: &str, version: Option<i32>) -> Result<()> {
    match version {
        Some(version) => nodes.delete_node_versioned(path, version)?,
        None => nodes.delete_node(path)?,
    };
    println!("Deleted {}", path);
    Ok(())
}

pub fn children(nodes: &Nodes, path: &str) -> Result<()> {
    for child in nodes.get_children(path)? {
        println!("{}", child);
    }
    Ok(())
}

pub fn get(nodes: &Nodes, path: &str, logger: &Logger) -> Result<()> {
    let watcher = Arc::new(LoggingWatcher::new(logger.clone()));
    let data = nodes.get_data(path, watcher)?;
    println!("{}", data);
    Ok(())
}

fn print_stat(stat: &NodeStat) -> Result<()> {
    let stat = serde_json::to_string_pretty(stat).with_context(|_| ErrorKind::Encode("node stat"))?;
    println!("{}", stat);
    Ok(())
}
