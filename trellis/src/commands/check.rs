use clap::Args;
use eyre::Result;
use trellis_core::ReleaseTrack;

use super::{RootArgs, UnwrapOrExit};

#[derive(Args)]
pub struct CheckCommand {
    #[command(flatten)]
    roots: RootArgs,
}

impl CheckCommand {
    /// Run the check command
    pub fn run(&self) -> Result<()> {
        let tree = self.roots.build().unwrap_or_exit();

        let mut groups = 0usize;
        let mut leaves = 0usize;
        let mut defects = 0usize;

        for id in tree.ids() {
            let node = tree.node(id);
            if id == tree.root() {
                continue;
            }
            if node.is_leaf() {
                leaves += 1;
            } else {
                groups += 1;
            }

            // Force every variant so body defects surface now.
            for track in ReleaseTrack::ALL {
                if !node.tracks().contains(track) {
                    continue;
                }
                let Some(variant) = tree.node(id).variant_for(track) else {
                    continue;
                };
                if let Err(err) = variant.def.force() {
                    defects += 1;
                    eprintln!("error: {} ({}): {}", tree.path_of(id).join(" "), track, err);
                }
            }
        }

        if defects > 0 {
            eprintln!("\n{} defective definition(s)", defects);
            std::process::exit(1);
        }

        println!(
            "✓ {} is valid: {} group(s), {} command(s)",
            self.roots.root.display(),
            groups,
            leaves
        );
        Ok(())
    }
}
