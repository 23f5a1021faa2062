use clap::Args;
use eyre::Result;
use trellis_core::Version;
use trellis_run::{Dispatcher, HookRegistry, HostContext, ResolvedInvocation, RunError};
use trellis_tree::Registry;

use super::{RootArgs, UnwrapOrExit};

#[derive(Args)]
pub struct ExecCommand {
    #[command(flatten)]
    roots: RootArgs,

    /// Tool version applied by the deprecation gate
    #[arg(long, default_value = "1.0.0")]
    tool_version: Version,

    /// The command line to dispatch
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

impl ExecCommand {
    /// Dispatch with an echoing hook standing in for real commands.
    pub fn run(&self) -> Result<()> {
        let tree = self.roots.build().unwrap_or_exit();
        let registry = Registry::new(tree);

        let mut hooks = HookRegistry::new();
        hooks.set_fallback(echo);

        let dispatcher = match Dispatcher::new(&registry, hooks, self.tool_version.clone()) {
            Ok(d) => d,
            Err(err) => {
                eprintln!("error: {}", err);
                std::process::exit(err.exit_code());
            }
        };

        let mut ctx = HostContext::new();
        if let Err(err) = dispatcher.dispatch(&mut ctx, &self.args) {
            eprintln!("error: {}", err);
            let mut source = std::error::Error::source(&err);
            while let Some(cause) = source {
                eprintln!("  caused by: {}", cause);
                source = cause.source();
            }
            std::process::exit(err.exit_code());
        }
        Ok(())
    }
}

fn echo(ctx: &mut HostContext, inv: &ResolvedInvocation) -> Result<(), RunError> {
    writeln!(ctx.out(), "{} ({})", inv.display_path(), inv.track)?;
    for (name, value) in &inv.args.flags {
        writeln!(ctx.out(), "  --{} = {:?}", name, value)?;
    }
    for positional in &inv.args.positionals {
        writeln!(ctx.out(), "  {} = {:?}", positional.name, positional.values)?;
    }
    Ok(())
}
