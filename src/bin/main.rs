use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use litstack::analysis::{Analyzer, Emitter, FrameState, MethodContext};
use litstack::bytecode::{listing, Insn};
use litstack::patterns::ComponentOffsetRewriter;
use litstack::Config;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "litstack")]
#[command(about = "Literal-propagating stack interpreter for JVM method bodies")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every record with the frame it executes against
    Trace {
        #[command(flatten)]
        method: MethodArgs,
    },

    /// Print max stack, max locals and record counts
    Summary {
        #[command(flatten)]
        method: MethodArgs,
    },

    /// Rewrite a labelled component's positioning offset and print the result
    Rewrite {
        #[command(flatten)]
        method: MethodArgs,

        /// Internal name of the component type the factory returns
        #[arg(long, value_name = "TYPE")]
        component: String,

        /// Internal name of the factory's alignment parameter type
        #[arg(long, value_name = "TYPE")]
        alignment: String,

        /// Label literal passed to the factory
        #[arg(long, default_value = "Mods...")]
        label: String,

        /// Replacement offset
        #[arg(long, default_value_t = 0.0)]
        replacement: f32,

        /// Write the rewritten listing here instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct MethodArgs {
    /// Input listing file
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Internal name of the declaring class
    #[arg(long, default_value = "Main")]
    owner: String,

    /// Method name
    #[arg(long, default_value = "run")]
    name: String,

    /// Method descriptor
    #[arg(long, default_value = "()V")]
    desc: String,

    /// Analyse as a static method (no receiver in local 0)
    #[arg(long = "static")]
    is_static: bool,

    /// Fail when the operand stack grows past this many slots
    #[arg(long, value_name = "SLOTS")]
    max_stack: Option<usize>,

    /// Disable constant folding
    #[arg(long)]
    no_fold: bool,
}

impl MethodArgs {
    fn context(&self) -> MethodContext {
        MethodContext::new(&self.owner, &self.name, &self.desc).with_static(self.is_static)
    }

    fn config(&self) -> Result<Config> {
        let mut config = Config::from_env()?;
        if let Some(limit) = self.max_stack {
            config = config.with_max_stack(limit);
        }
        if self.no_fold {
            config = config.with_constant_folding(false);
        }
        Ok(config)
    }

    fn load(&self) -> Result<Vec<Insn>> {
        listing::load(&self.input).with_context(|| format!("reading {}", self.input.display()))
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Trace { method } => trace(method)?,
        Commands::Summary { method } => summary(method)?,
        Commands::Rewrite {
            method,
            component,
            alignment,
            label,
            replacement,
            output,
        } => {
            let rewriter = ComponentOffsetRewriter::new(component, alignment)
                .with_label(label)
                .with_replacement(*replacement);
            rewrite(method, rewriter, output.as_ref())?;
        }
    }

    Ok(())
}

fn trace(args: &MethodArgs) -> Result<()> {
    let insns = args.load()?;
    let mut printer = |insn: &Insn, frame: &FrameState, _: &mut Emitter| -> litstack::Result<()> {
        println!("{:<48} {}", insn.to_string(), frame);
        Ok(())
    };
    let analysis = Analyzer::new(args.config()?).run(&args.context(), &insns, &mut [&mut printer])?;
    println!("max_stack={} max_locals={}", analysis.max_stack, analysis.max_locals);
    Ok(())
}

fn summary(args: &MethodArgs) -> Result<()> {
    let insns = args.load()?;
    let analysis = Analyzer::new(args.config()?).run(&args.context(), &insns, &mut [])?;
    println!("records:    {}", insns.len());
    println!("output:     {}", analysis.instructions.len());
    println!("max_stack:  {}", analysis.max_stack);
    println!("max_locals: {}", analysis.max_locals);
    Ok(())
}

fn rewrite(args: &MethodArgs, mut rewriter: ComponentOffsetRewriter, output: Option<&PathBuf>) -> Result<()> {
    let insns = args.load()?;
    let analysis = Analyzer::new(args.config()?).run(&args.context(), &insns, &mut [&mut rewriter])?;
    if !rewriter.is_done() {
        eprintln!("pattern not completed (stopped in {:?})", rewriter.state());
    }
    let rendered = listing::render(&analysis.instructions);
    match output {
        Some(path) => fs::write(path, rendered).with_context(|| format!("writing {}", path.display()))?,
        None => print!("{}", rendered),
    }
    Ok(())
}
