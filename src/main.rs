use anyhow::Result;
use clap::Parser;
use pro_tools::binding::{self, NativeModule};
use pro_tools::config::LoaderConfig;
use pro_tools::platform::DefaultPlatformDetector;
use pro_tools::runtime::RealRuntime;
use std::path::PathBuf;
use std::process::ExitCode;

/// pro-tools - release tooling for the pro-components monorepo
///
/// Loads the native module built for this platform and runs one of its
/// operations. The module is looked up in the binding directory first, then
/// in the matching `@ant-design/pro-tools-<platform>` package under
/// node_modules.
///
/// GITHUB_TOKEN is used for GitHub API requests when set.
///
/// Examples:
///   pro-tools changelog .          # Changelog of the latest release of each package
///   pro-tools changelog --all .    # Changelog of every release
///   pro-tools publish .            # Move `latest` once everything is published
#[derive(Parser, Debug)]
#[command(author, version = env!("PRO_TOOLS_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding pro-tools.<platform>.node (also via PRO_TOOLS_BINDING_DIR)
    #[arg(
        long = "binding-dir",
        env = "PRO_TOOLS_BINDING_DIR",
        value_name = "PATH",
        global = true
    )]
    pub binding_dir: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Check the route table of a project
    Routes(RoutesArgs),

    /// Generate .changelogs/components.md from release tags
    Changelog(ChangelogArgs),

    /// Tag published packages as latest
    Publish(PublishArgs),

    /// Show which native module this platform uses, without loading it
    Which,
}

#[derive(clap::Args, Debug)]
pub struct RoutesArgs {
    /// Project root
    #[arg(value_name = "REPO", default_value = ".")]
    pub repo: String,

    /// Routes file relative to the project root (default: config/routes.json)
    #[arg(long = "routes-file", value_name = "FILE")]
    pub routes_file: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ChangelogArgs {
    /// Repository root
    #[arg(value_name = "REPO", default_value = ".")]
    pub repo: String,

    /// Include every release, not only the latest one
    #[arg(long)]
    pub all: bool,

    /// Output directory relative to the repository (default: .changelogs)
    #[arg(long = "path", value_name = "DIR")]
    pub path: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct PublishArgs {
    /// Repository root
    #[arg(value_name = "REPO", default_value = ".")]
    pub repo: String,
}

fn main() -> Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = RealRuntime;
    let config = LoaderConfig::from_env(&runtime).with_binding_dir(cli.binding_dir);

    if let Commands::Which = cli.command {
        let candidate = binding::resolve(&runtime, &DefaultPlatformDetector, &config.names)?;
        println!("platform: {}", candidate.key.triple());
        println!("local:    {}", config.binding_dir.join(&candidate.local_file).display());
        println!("package:  {}", candidate.package);
        return Ok(ExitCode::SUCCESS);
    }

    let module = binding::init(config)?;
    log::debug!("Using {:?}", module);
    let status = dispatch(module, &cli.command)?;

    Ok(match status {
        0 => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}

fn dispatch(module: &NativeModule, command: &Commands) -> Result<i32> {
    let status = match command {
        Commands::Routes(args) => {
            let issues = module.check_routers(&args.repo, args.routes_file.as_deref())?;
            if issues > 0 {
                eprintln!("{} route issues found", issues);
            }
            issues
        }
        Commands::Changelog(args) if args.all => {
            module.gen_all_changelogs(&args.repo, args.path.as_deref())?
        }
        Commands::Changelog(args) => module.gen_changelogs(&args.repo, args.path.as_deref())?,
        Commands::Publish(args) => module.check_publish(&args.repo)?,
        Commands::Which => 0,
    };
    Ok(status)
}
