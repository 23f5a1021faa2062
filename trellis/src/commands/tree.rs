use clap::Args;
use eyre::Result;
use trellis_core::{ReleaseTrack, Version};
use trellis_tree::Registry;

use super::{RootArgs, UnwrapOrExit};

#[derive(Args)]
pub struct TreeCommand {
    #[command(flatten)]
    roots: RootArgs,

    /// Release track to list (defaults to every track)
    #[arg(long)]
    track: Option<ReleaseTrack>,

    /// Tool version used for deprecation decorations
    #[arg(long, default_value = "1.0.0")]
    tool_version: Version,
}

impl TreeCommand {
    pub fn run(&self) -> Result<()> {
        let tree = self.roots.build().unwrap_or_exit();
        let registry = Registry::new(tree);

        let tracks: Vec<ReleaseTrack> = match self.track {
            Some(track) => vec![track],
            None => ReleaseTrack::ALL.to_vec(),
        };

        for track in tracks {
            let leaves = registry.leaves_under(track);
            if leaves.is_empty() {
                continue;
            }
            println!("{}:", track);
            for id in leaves {
                let mut line = format!("  {}", registry.path_of(id).join(" "));
                if let Some(record) = registry.deprecation(id, track) {
                    line.push(' ');
                    line.push_str(record.decoration(&self.tool_version));
                }
                if let Some(desc) = registry.tree().node(id).description(track) {
                    line.push_str(&format!("  {}", desc));
                }
                println!("{}", line);
            }
        }
        Ok(())
    }
}
