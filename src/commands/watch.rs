use std::sync::Arc;

use crossbeam_channel::unbounded;
use failure::ResultExt;
use slog::info;
use slog::Logger;

use super::super::node::WatchEvent;
use super::super::watch::Watcher;
use super::super::ErrorKind;
use super::super::Nodes;
use super::super::Result;

/// Arm a watch on the node and print events as they arrive.
///
/// Returns the number of events printed, once `events` events were printed
/// or no more events can arrive.
pub fn run(
    nodes: &Nodes,
    path: &str,
    events: usize,
    continuous: bool,
    logger: &Logger,
) -> Result<usize> {
    let (sender, receiver) = unbounded();
    let watcher: Arc<dyn Watcher> = Arc::new(move |event: WatchEvent| {
        // The receiver is gone once enough events were printed.
        let _ = sender.send(event);
    });
    let stat = if continuous {
        nodes.watch_continuously(path, watcher)?
    } else {
        nodes.watch(path, watcher)?
    };
    info!(
        logger, "Watching node for changes";
        "path" => path,
        "exists" => stat.is_some(),
        "continuous" => continuous,
    );

    // A one-shot watch drops the sender once it fires, ending the loop early.
    let mut printed = 0;
    while printed < events {
        let event = match receiver.recv() {
            Ok(event) => event,
            Err(_) => break,
        };
        let event = serde_json::to_string(&event).with_context(|_| ErrorKind::Encode("watch event"))?;
        println!("{}", event);
        printed += 1;
    }
    Ok(printed)
}
