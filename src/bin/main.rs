use std::env;

use aa_tree::AaTree;
use anyhow::{bail, Context};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const VALUES: u32 = 100;

// The binary's own events have target `main`; everything else is let through at `warn`.
const DEFAULT_FILTER: &str = "aa_tree=info,main=info,warn";

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("AA_TREE_LOG").unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let format = env::var("AA_TREE_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry.with(fmt::layer().json().with_ansi(false)).init();
        }
        _ => {
            registry.with(fmt::layer().compact()).init();
        }
    }
}

// Adds 0..100 in ascending order, then removes them in the same order, checking membership on
// both sides of every step.
fn main() -> anyhow::Result<()> {
    init_tracing();

    let mut tree = AaTree::new();

    for value in 0..VALUES {
        if tree.contains(&value).unwrap_or(false) {
            bail!("tree should not contain {value}");
        }

        tree.add(value).with_context(|| format!("adding {value}"))?;

        if !tree.contains(&value)? {
            bail!("tree should contain {value}");
        }
    }

    tree.assert_invariants();
    info!(len = tree.len(), height = tree.height(), "filled tree");

    for value in 0..VALUES {
        if !tree.contains(&value)? {
            bail!("tree should contain {value}");
        }

        tree.remove(&value).with_context(|| format!("removing {value}"))?;

        if tree.contains(&value).unwrap_or(false) {
            bail!("tree should not contain {value}");
        }
    }

    tree.assert_invariants();
    info!(len = tree.len(), "emptied tree");

    Ok(())
}
